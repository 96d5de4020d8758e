//! # Pokedex Common Library
//!
//! Shared code for the pokedex services including:
//! - Record model shared by every lookup tier
//! - Database initialization and versioned migrations
//! - TOML bootstrap configuration loading
//! - Common error types

pub mod config;
pub mod db;
pub mod error;

pub use db::models::{NewRecord, Record};
pub use error::{Error, Result};

//! Common error types for pokedex

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for pokedex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bootstrapping a pokedex service
/// (configuration, database setup, migrations).
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be read
    #[error("Failed to read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::config::TomlConfig`]
    #[error("Failed to parse config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration value rejected during validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema migration failed or database is ahead of this build
    #[error("Migration v{version} failed: {reason}")]
    Migration { version: i32, reason: String },
}

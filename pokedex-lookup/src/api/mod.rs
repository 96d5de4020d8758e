//! HTTP API handlers for pokedex-lookup

pub mod health;
pub mod records;

pub use health::health_routes;
pub use records::{get_record, record_routes, TIER_HEADER};

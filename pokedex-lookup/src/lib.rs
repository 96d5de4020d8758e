//! pokedex-lookup library interface
//!
//! Tiered record lookup (cache → SQLite store → PokeAPI) behind a small
//! HTTP API. Exposes the pipeline and its tier traits for integration tests.

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::services::RecordPipeline;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Lookup pipeline with its injected tiers
    pub pipeline: Arc<RecordPipeline>,
    /// Upper bound on a single lookup
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(pipeline: Arc<RecordPipeline>, request_timeout: Duration) -> Self {
        Self {
            pipeline,
            request_timeout,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::record_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

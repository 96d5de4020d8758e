//! Record lookup endpoint
//!
//! `GET /records/:key`:
//! - 200 with the record as JSON
//! - 404 with an empty body when no tier knows the key
//! - 4xx/5xx with `{"error": {...}}` otherwise

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Response header naming the tier that served the record
pub const TIER_HEADER: &str = "x-lookup-tier";

/// GET /records/:key
///
/// The lookup is bounded by the configured request timeout. If the client
/// goes away first, the handler future is dropped along with any in-flight
/// tier calls.
pub async fn get_record(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    let lookup = tokio::time::timeout(state.request_timeout, state.pipeline.lookup_traced(&key))
        .await
        .map_err(|_| {
            warn!(key = %key, timeout = ?state.request_timeout, "Lookup timed out");
            ApiError::Timeout
        })??;

    match lookup {
        Some(found) => Ok((
            [(TIER_HEADER, found.tier.as_str())],
            Json(found.record),
        )
            .into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// Build record lookup routes
pub fn record_routes() -> Router<AppState> {
    Router::new().route("/records/:key", get(get_record))
}

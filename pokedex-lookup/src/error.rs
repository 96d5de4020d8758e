//! Error types for pokedex-lookup HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::LookupError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Lookup pipeline failure
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Lookup did not finish within the request timeout (504)
    #[error("Lookup timed out")]
    Timeout,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Lookup(err) => match err {
                LookupError::Validation(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                LookupError::ExternalUnavailable(_) => {
                    (StatusCode::BAD_GATEWAY, "EXTERNAL_UNAVAILABLE")
                }
                LookupError::StoreUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
                }
                LookupError::CacheUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "CACHE_UNAVAILABLE")
                }
                LookupError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
                LookupError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            ApiError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

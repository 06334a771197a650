//! Error types for the result cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the result cache.
///
/// Errors raised by a wrapped computation are never converted into this type;
/// they travel back to the caller unchanged.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Rejected cache configuration (e.g. `max_entries == 0`)
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// Mutual-exclusion lock could not be acquired in time
    #[error("Still locked after timeout ({timeout_ms} ms): {key}")]
    LockTimeout { key: String, timeout_ms: u64 },

    /// A weak-held value was reclaimed between the expiry check and the read
    #[error("Weak value reclaimed: {0}")]
    StaleReference(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            CacheError::LockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::StaleReference(_) => StatusCode::NOT_FOUND,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

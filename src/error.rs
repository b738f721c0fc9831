//! Error types for the object cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Failures reported by a persistent store.
///
/// "Not stored" outcomes (lost `add`, stale `cas`, absent key) are not errors;
/// stores report those as `Ok(false)` / `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No server has been registered with the store
    #[error("No servers registered")]
    NoServers,

    /// The server could not be reached or timed out
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    /// increment/decrement on a value that is not a decimal integer
    #[error("Value is not numeric: {0}")]
    NotNumeric(String),

    /// Server address could not be parsed
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),
}

/// Result type for persistent store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Cache Error Enum ==
/// Unified error type for object cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in either tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Write lost a race against a concurrent writer; the entry was invalidated
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Operation needs the persistent tier, which is not active for this request
    #[error("Persistent cache unavailable: {0}")]
    PersistentUnavailable(String),

    /// Persistent store reported a failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Value could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Conflict(_) => StatusCode::CONFLICT,
            CacheError::PersistentUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Store(_) => StatusCode::BAD_GATEWAY,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the object cache.
pub type Result<T> = std::result::Result<T, CacheError>;

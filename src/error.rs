//! Error types for the request cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the request cache.
///
/// `Clone` so that one settled fetch can hand the same error to every caller
/// that joined it.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Empty cache key
    #[error("Cache key cannot be empty")]
    InvalidKey,

    /// Cache constructed with a capacity of zero
    #[error("Invalid cache capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The fetcher for a key failed; shared by every joined caller
    #[error("Fetch failed for '{key}': {cause:#}")]
    Fetch {
        key: String,
        cause: Arc<anyhow::Error>,
    },

    /// Upstream could not be reached on a pass-through request
    #[error("Upstream error: {0}")]
    Upstream(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Fetch { .. } | CacheError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CacheError::InvalidCapacity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the request cache.
pub type Result<T> = std::result::Result<T, CacheError>;

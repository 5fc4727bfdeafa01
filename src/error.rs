//! Error types for the HTTP cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer and its store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in the store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key has expired
    #[error("Key expired: {0}")]
    Expired(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Store is full and eviction failed
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// A stored entry could not be decoded
    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),

    /// A response could not be encoded for storage
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The backing store failed
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid or immutable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The downstream handler failed while its response was being captured
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true when the error means "nothing usable is stored under this key".
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::Expired(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::CacheFull(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            CacheError::Store(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            CacheError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CacheError::CorruptEntry(_)
            | CacheError::Encoding(_)
            | CacheError::Config(_)
            | CacheError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_classification() {
        assert!(CacheError::NotFound("k".to_string()).is_miss());
        assert!(CacheError::Expired("k".to_string()).is_miss());
        assert!(!CacheError::Store("down".to_string()).is_miss());
        assert!(!CacheError::CorruptEntry("bad".to_string()).is_miss());
    }

    #[test]
    fn test_store_fault_maps_to_5xx() {
        let response = CacheError::Store("connection refused".to_string()).into_response();
        assert!(response.status().is_server_error());

        let response = CacheError::CorruptEntry("truncated".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

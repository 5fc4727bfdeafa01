//! API Handlers
//!
//! A small demo origin served behind the cache layer, plus the uncached
//! operational endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::cache::{CacheStorage, SharedStore};
use crate::config::Config;
use crate::httpcache::HttpCache;
use crate::models::{HealthResponse, StatsResponse};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store handle, read directly by `/stats`
    pub store: SharedStore,
    /// Cache layer state
    pub cache: HttpCache,
}

impl AppState {
    /// Builds the cache layer on top of a provisioned store.
    pub fn new(store: SharedStore, config: &Config) -> Self {
        let storage: std::sync::Arc<dyn CacheStorage> = store.clone();
        Self {
            cache: HttpCache::new(storage, config),
            store,
        }
    }
}

// == Demo Origin ==

/// GET /hello, fresh for a minute.
pub async fn hello_handler() -> impl IntoResponse {
    (
        [(CACHE_CONTROL, "max-age=60"), (CONTENT_TYPE, TEXT_PLAIN)],
        "Hello, world",
    )
}

/// GET /default, no freshness information; cached only with a default TTL.
pub async fn default_handler() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, TEXT_PLAIN)],
        format!("Generated at {}", Utc::now().to_rfc3339()),
    )
}

/// GET /private, never stored.
pub async fn private_handler() -> impl IntoResponse {
    (
        [(CACHE_CONTROL, "private, no-store"), (CONTENT_TYPE, TEXT_PLAIN)],
        format!("Generated at {}", Utc::now().to_rfc3339()),
    )
}

/// POST /echo, echoes the request body; fresh for 30 seconds.
///
/// The body is not part of the cache key, so later POSTs receive the first
/// stored echo until it goes stale.
pub async fn echo_handler(body: Bytes) -> impl IntoResponse {
    ([(CACHE_CONTROL, "max-age=30")], body)
}

// == Operational Endpoints ==

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = state.store.read().await;
    Json(StatsResponse::new(&store.stats(), store.max_size()))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.cache_name()))
}

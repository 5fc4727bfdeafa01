//! API Routes
//!
//! Puts the demo origin behind the cache middleware and mounts the
//! operational endpoints beside it.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    default_handler, echo_handler, health_handler, hello_handler, private_handler, stats_handler,
    AppState,
};
use crate::httpcache::cache_middleware;

/// Creates the main router.
///
/// # Endpoints
/// - `GET /hello`, `GET /default`, `GET /private`, `POST /echo` - demo origin, cached
/// - `GET /stats` - store statistics, uncached
/// - `GET /health` - health check, uncached
///
/// # Middleware
/// - Cache: only wraps the demo origin routes
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let origin = Router::new()
        .route("/hello", get(hello_handler))
        .route("/default", get(default_handler))
        .route("/private", get(private_handler))
        .route("/echo", post(echo_handler))
        .route_layer(middleware::from_fn_with_state(
            state.cache.clone(),
            cache_middleware,
        ));

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .merge(origin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

//! Mini HTTP Cache - An inline HTTP response cache
//!
//! Decides per request whether to serve from the store, forward and store, or
//! forward untouched, with RFC 7234 freshness and age handling and an
//! RFC 9211 `Cache-Status` header on every response.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod httpcache;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::StoreRegistry;
pub use config::Config;
pub use httpcache::{cache_middleware, HttpCache};
pub use tasks::spawn_cleanup_task;

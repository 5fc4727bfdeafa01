//! Store Adapter
//!
//! The get/put-with-ttl contract the HTTP cache consumes, and its
//! implementation for the shared in-memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::sync::RwLock;

use crate::cache::MemoryStore;
use crate::error::Result;

/// Shared handle to the in-memory store.
pub type SharedStore = Arc<RwLock<MemoryStore>>;

/// Key-value storage with per-value expiry.
///
/// Implementations only promise that a successful `put_with_ttl` eventually
/// becomes visible to later `get` calls on the same logical map.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Fetches the bytes stored under `key`.
    ///
    /// Absent or expired keys yield `CacheError::NotFound` or
    /// `CacheError::Expired`; anything else is a store fault.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Stores `value` under `key` for `ttl`.
    async fn put_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;
}

#[async_trait]
impl CacheStorage for RwLock<MemoryStore> {
    async fn get(&self, key: &str) -> Result<Bytes> {
        // Write lock: lookups update recency and stats
        self.write().await.get(key)
    }

    async fn put_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.write().await.put(key.to_string(), value, ttl)
    }
}

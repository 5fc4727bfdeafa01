//! Response DTOs for the operational endpoints
//!
//! Defines the JSON bodies served by `/stats` and `/health`.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries evicted to stay within the byte budget
    pub evictions: u64,
    /// Entries written
    pub writes: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Current number of bytes in the store
    pub total_bytes: u64,
    /// Configured byte budget
    pub max_size: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from store statistics
    pub fn new(stats: &CacheStats, max_size: u64) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            writes: stats.writes,
            total_entries: stats.total_entries,
            total_bytes: stats.total_bytes,
            max_size,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Identifier reported in `Cache-Status`
    pub cache_name: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(cache_name: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            cache_name: cache_name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

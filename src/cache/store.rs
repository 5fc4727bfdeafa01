//! Memory Store Module
//!
//! Byte-budgeted key-value engine combining HashMap storage with LRU tracking
//! and mandatory per-value TTL.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;

use crate::cache::{CacheStats, LruTracker, StoredValue};
use crate::error::{CacheError, Result};

// == Memory Store ==
/// In-process store with LRU eviction by total bytes and TTL expiry.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    entries: HashMap<String, StoredValue>,
    /// LRU access and size tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of bytes held at once
    max_size: u64,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a new store holding at most `max_size` bytes of values.
    pub fn new(max_size: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_size,
        }
    }

    // == Put ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Overwrites replace the value and restart its TTL. Least recently used
    /// values are evicted until the new value fits the byte budget.
    pub fn put(&mut self, key: String, value: Bytes, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidRequest(format!(
                "refusing to store '{}' with a zero TTL",
                key
            )));
        }

        let size = value.len() as u64;
        if size > self.max_size {
            return Err(CacheError::CacheFull(format!(
                "value of {} bytes exceeds the store budget of {} bytes",
                size, self.max_size
            )));
        }

        // The old value no longer counts against the budget
        if self.entries.remove(&key).is_some() {
            self.lru.remove(&key);
        }

        while self.lru.total_bytes() + size > self.max_size {
            match self.lru.evict_oldest() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                }
                None => {
                    return Err(CacheError::CacheFull(
                        "Cache is full and eviction failed".to_string(),
                    ))
                }
            }
        }

        self.entries.insert(key.clone(), StoredValue::new(value, ttl));
        self.lru.touch(&key, size);
        self.stats.record_write();
        self.refresh_occupancy();

        Ok(())
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired values are removed and reported as `Expired`.
    pub fn get(&mut self, key: &str) -> Result<Bytes> {
        let expired = match self.entries.get(key) {
            Some(stored) => stored.is_expired(),
            None => {
                self.stats.record_miss();
                return Err(CacheError::NotFound(key.to_string()));
            }
        };

        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
            self.refresh_occupancy();
            self.stats.record_miss();
            return Err(CacheError::Expired(key.to_string()));
        }

        self.stats.record_hit();
        self.lru.refresh(key);
        self.entries
            .get(key)
            .map(|stored| stored.value.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Remaining lifetime of a live value, without touching recency or stats.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|stored| !stored.is_expired())
            .map(StoredValue::ttl_remaining)
    }

    // == Stats ==
    /// Returns current store statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_occupancy(self.entries.len(), self.lru.total_bytes());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired values and returns how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, stored)| stored.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.refresh_occupancy();
        expired_keys.len()
    }

    /// Returns the configured byte budget.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Returns the number of bytes currently held.
    pub fn size_bytes(&self) -> u64 {
        self.lru.total_bytes()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn refresh_occupancy(&mut self) {
        self.stats
            .set_occupancy(self.entries.len(), self.lru.total_bytes());
    }
}

//! Stored Value Module
//!
//! Defines the byte payload kept by the in-memory store together with its expiry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Bytes;

// == Stored Value ==
/// A single value held by the store, with its mandatory expiration.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The stored bytes
    pub value: Bytes,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl StoredValue {
    // == Constructor ==
    /// Creates a value that expires `ttl` after now.
    pub fn new(value: Bytes, ttl: Duration) -> Self {
        Self::new_at(value, ttl, current_timestamp_ms())
    }

    /// Creates a value as if it had been written at `now_ms`.
    pub fn new_at(value: Bytes, ttl: Duration, now_ms: u64) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        Self {
            value,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
        }
    }

    /// Size charged against the store budget.
    pub fn size(&self) -> u64 {
        self.value.len() as u64
    }

    // == Is Expired ==
    /// Checks if the value has expired.
    ///
    /// A value is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        Duration::from_millis(self.expires_at.saturating_sub(current_timestamp_ms()))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

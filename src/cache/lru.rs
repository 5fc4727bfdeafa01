//! LRU Tracker Module
//!
//! Size-aware Least Recently Used tracking for byte-budgeted eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access recency and the byte size of every key.
///
/// Each touch stamps the key with a fresh tick; the smallest tick is the
/// least recently used key. Touch, remove and evict are `O(log n)`.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// tick -> key, oldest first
    order: BTreeMap<u64, String>,
    /// key -> (tick, size in bytes)
    slots: HashMap<String, (u64, u64)>,
    /// Sum of all tracked sizes
    total_bytes: u64,
    next_tick: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used and records its current size.
    pub fn touch(&mut self, key: &str, size: u64) {
        self.remove(key);
        let tick = self.next_tick;
        self.next_tick += 1;
        self.order.insert(tick, key.to_string());
        self.slots.insert(key.to_string(), (tick, size));
        self.total_bytes += size;
    }

    /// Marks a key as recently used without changing its size.
    ///
    /// Unknown keys are ignored.
    pub fn refresh(&mut self, key: &str) {
        if let Some(&(_, size)) = self.slots.get(key) {
            self.touch(key, size);
        }
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some((tick, size)) = self.slots.remove(key) {
            self.order.remove(&tick);
            self.total_bytes -= size;
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        if let Some((_, size)) = self.slots.remove(&key) {
            self.total_bytes -= size;
        }
        Some(key)
    }

    /// Returns the least recently used key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    /// Total bytes of all tracked keys.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_new() {
        let lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.total_bytes(), 0);
    }

    #[test]
    fn test_touch_accumulates_sizes() {
        let mut lru = LruTracker::new();

        lru.touch("a", 10);
        lru.touch("b", 20);
        lru.touch("c", 30);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.total_bytes(), 60);
        assert_eq!(lru.peek_oldest(), Some("a"));
    }

    #[test]
    fn test_touch_existing_key_replaces_size() {
        let mut lru = LruTracker::new();

        lru.touch("a", 10);
        lru.touch("b", 20);
        lru.touch("a", 5);

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.total_bytes(), 25);
        assert_eq!(lru.peek_oldest(), Some("b"));
    }

    #[test]
    fn test_refresh_keeps_size() {
        let mut lru = LruTracker::new();

        lru.touch("a", 10);
        lru.touch("b", 20);
        lru.refresh("a");
        lru.refresh("missing");

        assert_eq!(lru.total_bytes(), 30);
        assert_eq!(lru.peek_oldest(), Some("b"));
        assert!(!lru.contains("missing"));
    }

    #[test]
    fn test_evict_in_recency_order() {
        let mut lru = LruTracker::new();

        lru.touch("a", 1);
        lru.touch("b", 2);
        lru.touch("c", 3);
        lru.refresh("a");

        assert_eq!(lru.evict_oldest(), Some("b".to_string()));
        assert_eq!(lru.evict_oldest(), Some("c".to_string()));
        assert_eq!(lru.evict_oldest(), Some("a".to_string()));
        assert_eq!(lru.evict_oldest(), None);
        assert_eq!(lru.total_bytes(), 0);
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut lru = LruTracker::new();

        lru.touch("a", 4);
        lru.remove("nonexistent");

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.total_bytes(), 4);
    }
}

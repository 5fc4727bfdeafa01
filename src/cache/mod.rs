//! Cache Store Module
//!
//! The store adapter contract and the in-memory, byte-budgeted store behind it.

mod entry;
mod lru;
mod registry;
mod stats;
mod storage;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, StoredValue};
pub use lru::LruTracker;
pub use registry::StoreRegistry;
pub use stats::CacheStats;
pub use storage::{CacheStorage, SharedStore};
pub use store::MemoryStore;

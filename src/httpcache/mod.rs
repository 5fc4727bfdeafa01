//! HTTP Cache Module
//!
//! Request and response cacheability, age bookkeeping, the stored entry
//! format and the axum middleware that ties them to a store.

pub mod age;
pub mod codec;
pub mod directives;
pub mod key;
pub mod middleware;
pub mod policy;
pub mod pool;
pub mod status;

pub use codec::{CacheEntry, EntryMeta};
pub use key::CacheKey;
pub use middleware::{cache_middleware, HttpCache};
pub use policy::{CachePolicy, Capture, Exchange, RequestDecision, ResponseDecision};
pub use status::{CacheStatus, ForwardDetail, MalformedHeader, NotStorableReason, CACHE_STATUS};

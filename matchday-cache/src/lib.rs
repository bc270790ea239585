//! TTL cache with request deduplication.
//!
//! In-memory, type-erased key/value store where every entry carries its own
//! expiry, plus a deduplicating fetch so that concurrent misses for the same
//! key trigger a single upstream call.
//!
//! ```rust
//! use std::time::Duration;
//! use matchday_cache::TtlCache;
//!
//! let cache = TtlCache::new();
//! cache.set_with_ttl("fixtures-live-all", vec![1035037u64], Duration::from_secs(60));
//!
//! let fixtures = cache.get::<Vec<u64>>("fixtures-live-all").unwrap();
//! assert_eq!(fixtures[0], 1035037);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod dedup;

pub use cache::{CacheConfig, CacheStats, CachedValue, EntryInfo, TtlCache};
pub use matchday_core::error::FetchError;

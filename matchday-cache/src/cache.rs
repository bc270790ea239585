//! In-memory TTL cache.
//!
//! Values of any `Send + Sync` type are stored behind `Arc<dyn Any>` and
//! handed back as `Arc<T>`, so readers share the stored value instead of
//! copying it. Expiry is lazy: an expired entry stays in the map until a read
//! (or [`TtlCache::cleanup_expired`]) notices it.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use matchday_core::clock::{Clock, SystemClock};
use matchday_core::constants::DEFAULT_TTL_MS;

use crate::dedup::Flight;

pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// Cache entry with TTL.
struct CacheEntry {
    value: AnyValue,
    inserted_at: Instant,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.age(now) > self.ttl
    }

    fn snapshot(&self, now: Instant) -> Snapshot {
        Snapshot {
            value: Arc::clone(&self.value),
            age: self.age(now),
            stored_at: self.stored_at,
            ttl: self.ttl,
        }
    }
}

/// Copy of a live entry taken under the read lock.
struct Snapshot {
    value: AnyValue,
    age: Duration,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL in milliseconds for writes that do not pass one
    pub default_ttl_ms: u64,
    /// Upper bound on stored entries; `None` means unbounded
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: DEFAULT_TTL_MS,
            max_entries: None,
        }
    }
}

impl CacheConfig {
    /// Sets the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = ttl.as_millis() as u64;
        self
    }

    /// Bounds the number of stored entries.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

/// A live value together with its age.
#[derive(Debug)]
pub struct CachedValue<T> {
    /// The stored value, shared with the cache
    pub data: Arc<T>,
    /// Time since the value was stored
    pub age: Duration,
    /// Wall-clock time the value was stored
    pub timestamp: DateTime<Utc>,
}

impl<T> Clone for CachedValue<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            age: self.age,
            timestamp: self.timestamp,
        }
    }
}

/// Metadata of a live entry, without its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryInfo {
    /// Wall-clock time the value was stored
    pub timestamp: DateTime<Utc>,
    /// Time since the value was stored
    pub age: Duration,
    /// TTL the value was stored with
    pub ttl: Duration,
}

impl EntryInfo {
    /// Time left before the entry expires.
    pub fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age)
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// Entries physically stored (including expired ones not yet evicted)
    pub total_entries: usize,
    /// Stored entries past their TTL
    pub expired_entries: usize,
    /// Live entries
    pub valid_entries: usize,
    /// Keys with a fetch in flight
    pub in_flight: usize,
    /// Configured bound, if any
    pub capacity: Option<usize>,
}

pub(crate) struct Inner {
    entries: RwLock<HashMap<String, CacheEntry>>,
    pub(crate) pending: DashMap<String, Flight>,
    pub(crate) next_flight_id: AtomicU64,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl Inner {
    /// Returns a live entry, evicting it if it has expired.
    fn lookup(&self, key: &str) -> Option<Snapshot> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.snapshot(now)),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a fresh set may have landed in between.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            debug!(key, "Evicted expired entry");
        }
        None
    }

    pub(crate) fn store(&self, key: &str, value: AnyValue, ttl: Duration) {
        let mut entries = self.entries.write();

        if let Some(max) = self.config.max_entries {
            if entries.len() >= max && !entries.contains_key(key) {
                let now = self.clock.now();
                entries.retain(|_, entry| !entry.is_expired(now));
            }
            if entries.len() >= max && !entries.contains_key(key) {
                if let Some(oldest_key) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest_key);
                    debug!(key = %oldest_key, "Evicted oldest entry at capacity");
                }
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: self.clock.now(),
                stored_at: self.clock.wall_clock(),
                ttl,
            },
        );
    }
}

/// Process-wide TTL cache with in-flight request deduplication.
///
/// Cloning is cheap and every clone shares the same store, so one instance
/// built at startup can be handed to every component that needs it.
#[derive(Clone)]
pub struct TtlCache {
    pub(crate) inner: Arc<Inner>,
}

impl TtlCache {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Creates a cache that reads time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: impl Clock) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                pending: DashMap::new(),
                next_flight_id: AtomicU64::new(0),
                clock: Arc::new(clock),
                config,
            }),
        }
    }

    /// Returns the configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// TTL applied by [`set`](Self::set) and [`fetch_with_dedup`](Self::fetch_with_dedup).
    pub fn default_ttl(&self) -> Duration {
        self.inner.config.default_ttl()
    }

    /// Stores `data` under `key` with the default TTL.
    pub fn set<T: Send + Sync + 'static>(&self, key: &str, data: T) {
        self.set_with_ttl(key, data, self.default_ttl());
    }

    /// Stores `data` under `key`, expiring `ttl` from now.
    ///
    /// Overwrites any previous entry and restarts its lifetime.
    pub fn set_with_ttl<T: Send + Sync + 'static>(&self, key: &str, data: T, ttl: Duration) {
        self.inner.store(key, Arc::new(data), ttl);
    }

    /// Gets a live value.
    ///
    /// Returns `None` if the key is missing, expired (the entry is then
    /// removed) or holds a value of another type.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let snapshot = self.inner.lookup(key)?;
        downcast(key, snapshot.value)
    }

    /// Like [`get`](Self::get), also reporting the value's age and store time.
    pub fn get_with_info<T: Send + Sync + 'static>(&self, key: &str) -> Option<CachedValue<T>> {
        let snapshot = self.inner.lookup(key)?;
        Some(CachedValue {
            data: downcast(key, snapshot.value)?,
            age: snapshot.age,
            timestamp: snapshot.stored_at,
        })
    }

    /// Metadata of a live entry, regardless of its value type.
    pub fn get_info(&self, key: &str) -> Option<EntryInfo> {
        self.inner.lookup(key).map(|snapshot| EntryInfo {
            timestamp: snapshot.stored_at,
            age: snapshot.age,
            ttl: snapshot.ttl,
        })
    }

    /// Returns true if `key` holds a live value.
    pub fn has(&self, key: &str) -> bool {
        self.inner.lookup(key).is_some()
    }

    /// Removes one entry, or every entry when `key` is `None`.
    pub fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => self.remove(key),
            None => self.clear_all(),
        }
    }

    /// Removes a cached entry.
    pub fn remove(&self, key: &str) {
        self.inner.entries.write().remove(key);
    }

    /// Clears all cached entries.
    ///
    /// Fetches already in flight are not affected and will store their result.
    pub fn clear_all(&self) {
        self.inner.entries.write().clear();
    }

    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (total, expired) = {
            let now = self.inner.clock.now();
            let entries = self.inner.entries.read();
            let expired = entries.values().filter(|e| e.is_expired(now)).count();
            (entries.len(), expired)
        };

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            valid_entries: total.saturating_sub(expired),
            in_flight: self.inner.pending.len(),
            capacity: self.inner.config.max_entries,
        }
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.inner.config)
            .field("entries", &self.len())
            .finish()
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(key: &str, value: AnyValue) -> Option<Arc<T>> {
    match value.downcast::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(key, expected = type_name::<T>(), "Cached value has another type");
            None
        }
    }
}

//! In-flight request deduplication.
//!
//! When several callers miss the cache for the same key at once, only the
//! first one runs its producer. The others attach to the same shared future
//! and receive a clone of its outcome, success or failure. The in-flight
//! marker is removed as soon as the producer settles, so a failure never
//! blocks the next attempt.

use std::any::type_name;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use matchday_core::error::FetchError;

use crate::cache::{downcast, AnyValue, Inner, TtlCache};

type InFlight = Shared<BoxFuture<'static, Result<AnyValue, FetchError>>>;

/// A registered in-flight producer.
pub(crate) struct Flight {
    id: u64,
    future: InFlight,
}

/// Clears the in-flight marker when the producer settles, including on panic.
struct FlightGuard {
    inner: Weak<Inner>,
    key: String,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.pending.remove_if(&self.key, |_, flight| flight.id == self.id);
        }
    }
}

impl TtlCache {
    /// Returns the cached value for `key`, or produces it with the default TTL.
    ///
    /// See [`fetch_with_dedup_ttl`](Self::fetch_with_dedup_ttl).
    pub async fn fetch_with_dedup<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
    ) -> Result<Arc<T>, FetchError>
    where
        T: Send + Sync + 'static,
        E: StdError + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.fetch_with_dedup_ttl(key, self.default_ttl(), producer).await
    }

    /// Returns the cached value for `key`, or produces it at most once.
    ///
    /// 1. A live cached value is returned without calling `producer`.
    /// 2. If a fetch for `key` is already in flight, this call waits for it
    ///    and returns its outcome.
    /// 3. Otherwise `producer` runs; on success the value is stored with
    ///    `ttl` before being returned.
    ///
    /// `producer` is first called when the fetch is polled, after the flight
    /// is registered, so it may inspect the cache (`is_pending`, `stats`).
    ///
    /// Producer errors are wrapped in [`FetchError::Producer`] and shared by
    /// every waiter. They are never cached.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cache = TtlCache::new();
    /// let table = cache
    ///     .fetch_with_dedup_ttl("standings-39-2022", STANDINGS_TTL, || async move {
    ///         client.standings("39", "2022").await
    ///     })
    ///     .await?;
    /// ```
    pub async fn fetch_with_dedup_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<Arc<T>, FetchError>
    where
        T: Send + Sync + 'static,
        E: StdError + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.fetch_with_dedup_by(key, move |_: &T| ttl, producer).await
    }

    /// Like [`fetch_with_dedup_ttl`](Self::fetch_with_dedup_ttl), with the TTL
    /// chosen from the produced value.
    ///
    /// `ttl_for` runs once, in the producing call, right before the value is
    /// stored. Waiters attached to that fetch never call their own `ttl_for`.
    pub async fn fetch_with_dedup_by<T, E, F, Fut, P>(
        &self,
        key: &str,
        ttl_for: P,
        producer: F,
    ) -> Result<Arc<T>, FetchError>
    where
        T: Send + Sync + 'static,
        E: StdError + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        P: FnOnce(&T) -> Duration + Send + 'static,
    {
        if let Some(hit) = self.get::<T>(key) {
            return Ok(hit);
        }

        // Never hold the entries lock while touching `pending`.
        let flight = match self.inner.pending.entry(key.to_string()) {
            Entry::Occupied(occupied) => {
                debug!(key, "Joining in-flight fetch");
                occupied.get().future.clone()
            }
            Entry::Vacant(vacant) => {
                // Another leader may have stored the value since our first look.
                if let Some(hit) = self.get::<T>(key) {
                    return Ok(hit);
                }
                let id = self.inner.next_flight_id.fetch_add(1, Ordering::Relaxed);
                debug!(key, id, "Starting fetch");
                let future = self.start_flight(key, id, ttl_for, producer);
                vacant.insert(Flight {
                    id,
                    future: future.clone(),
                });
                future
            }
        };

        let value = flight.await?;
        downcast(key, value).ok_or_else(|| FetchError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
    }

    /// Number of keys with a fetch in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.len()
    }

    /// Returns true if a fetch for `key` is in flight.
    pub fn is_pending(&self, key: &str) -> bool {
        self.inner.pending.contains_key(key)
    }

    fn start_flight<T, E, F, Fut, P>(&self, key: &str, id: u64, ttl_for: P, producer: F) -> InFlight
    where
        T: Send + Sync + 'static,
        E: StdError + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        P: FnOnce(&T) -> Duration + Send + 'static,
    {
        let inner = Arc::downgrade(&self.inner);
        let key = key.to_string();

        async move {
            let _guard = FlightGuard {
                inner: inner.clone(),
                key: key.clone(),
                id,
            };

            // Runs on first poll, never under the `pending` shard lock.
            match producer().await {
                Ok(value) => {
                    let ttl = ttl_for(&value);
                    let value: AnyValue = Arc::new(value);
                    // Store before the guard drops so late arrivals find the value.
                    if let Some(inner) = inner.upgrade() {
                        inner.store(&key, Arc::clone(&value), ttl);
                    }
                    Ok(value)
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Fetch failed");
                    Err(FetchError::producer(key.clone(), err))
                }
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use futures::future::join_all;
    use matchday_core::clock::MockClock;
    use matchday_core::MatchdayError;
    use serde_json::{json, Value};
    use tokio::sync::Semaphore;

    use crate::cache::CacheConfig;

    const TTL: Duration = Duration::from_secs(60);

    /// Producer that counts invocations and waits for `gate` before resolving.
    fn gated_producer(
        calls: Arc<AtomicUsize>,
        gate: Arc<Semaphore>,
        result: Result<Value, MatchdayError>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Value, MatchdayError>> + Send {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let _permit = gate.acquire().await.expect("gate closed");
                result
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_producer() {
        let cache = TtlCache::new();
        cache.set("k", json!("cached"));
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let value = cache
            .fetch_with_dedup("k", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, MatchdayError>(json!("fresh")) }
            })
            .await
            .unwrap();

        assert_eq!(*value, json!("cached"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_miss_produces_and_stores() {
        let cache = TtlCache::new();

        let value = cache
            .fetch_with_dedup_ttl("k", TTL, || async { Ok::<_, MatchdayError>(7u32) })
            .await
            .unwrap();

        assert_eq!(*value, 7);
        assert_eq!(cache.get::<u32>("k").as_deref(), Some(&7));
        assert_eq!(cache.get_info("k").unwrap().ttl, TTL);
        assert!(!cache.is_pending("k"));
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_producer() {
        let cache = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));

        let waiters = (0..8).map(|_| {
            let producer = gated_producer(calls.clone(), gate.clone(), Ok(json!([{"id": 1}])));
            cache.fetch_with_dedup_ttl("fixtures-live-all", TTL, producer)
        });

        let (results, _) = tokio::join!(join_all(waiters), async {
            tokio::task::yield_now().await;
            assert!(cache.is_pending("fixtures-live-all"));
            gate.add_permits(1);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            let value = result.as_ref().unwrap();
            assert!(Arc::ptr_eq(first, value));
        }
        assert!(!cache.is_pending("fixtures-live-all"));
        assert!(cache.has("fixtures-live-all"));
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter_and_is_not_cached() {
        let cache = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));

        let waiters = (0..5).map(|_| {
            let producer = gated_producer(
                calls.clone(),
                gate.clone(),
                Err(MatchdayError::HttpError("connection reset".into())),
            );
            cache.fetch_with_dedup_ttl("standings-39-2022", TTL, producer)
        });

        let (results, _) = tokio::join!(join_all(waiters), async {
            tokio::task::yield_now().await;
            gate.add_permits(1);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            let err = result.unwrap_err();
            assert_eq!(err.key(), "standings-39-2022");
            assert!(matches!(
                err.producer_error::<MatchdayError>(),
                Some(MatchdayError::HttpError(msg)) if msg == "connection reset"
            ));
        }
        assert!(!cache.has("standings-39-2022"));
        assert!(!cache.is_pending("standings-39-2022"));
    }

    #[tokio::test]
    async fn test_retry_after_failure_runs_new_producer() {
        let cache = TtlCache::new();

        let failed = cache
            .fetch_with_dedup("k", || async {
                Err::<Value, _>(MatchdayError::Timeout { seconds: 15 })
            })
            .await;
        assert!(failed.is_err());

        let retried = Arc::new(AtomicUsize::new(0));
        let counter = retried.clone();
        let value = cache
            .fetch_with_dedup("k", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, MatchdayError>(json!({"ok": true})) }
            })
            .await
            .unwrap();

        assert_eq!(retried.load(Ordering::SeqCst), 1);
        assert_eq!(*value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_different_keys_do_not_share() {
        let cache = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |key: &'static str| {
            let counter = calls.clone();
            let cache = cache.clone();
            async move {
                cache
                    .fetch_with_dedup(key, move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        async move { Ok::<_, MatchdayError>(key.to_string()) }
                    })
                    .await
            }
        };

        let (a, b) = tokio::join!(fetch("post-detail-1"), fetch("post-detail-2"));

        assert_eq!(*a.unwrap(), "post-detail-1");
        assert_eq!(*b.unwrap(), "post-detail-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_value_is_fetched_again() {
        let clock = MockClock::new();
        let cache = TtlCache::with_clock(CacheConfig::default(), clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2usize {
            let counter = calls.clone();
            let value = cache
                .fetch_with_dedup_ttl("news_latest", Duration::from_millis(500), move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok::<_, MatchdayError>(n) }
                })
                .await
                .unwrap();
            assert_eq!(*value, expected);
            clock.advance_millis(501);
        }
    }

    #[tokio::test]
    async fn test_ttl_chosen_from_value() {
        let cache = TtlCache::new();

        let value = cache
            .fetch_with_dedup_by(
                "fixtures-date-2020-01-01",
                |fixtures: &Value| {
                    if fixtures.as_array().is_some_and(|f| f.is_empty()) {
                        Duration::from_secs(60)
                    } else {
                        Duration::from_secs(86_400)
                    }
                },
                || async { Ok::<_, MatchdayError>(json!([{"id": 1}])) },
            )
            .await
            .unwrap();

        assert_eq!(*value, json!([{"id": 1}]));
        assert_eq!(
            cache.get_info("fixtures-date-2020-01-01").unwrap().ttl,
            Duration::from_secs(86_400)
        );
    }

    #[tokio::test]
    async fn test_waiter_with_other_type_gets_mismatch() {
        let cache = TtlCache::new();
        let gate = Arc::new(Semaphore::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = cache.fetch_with_dedup_ttl(
            "k",
            TTL,
            gated_producer(calls.clone(), gate.clone(), Ok(json!(1))),
        );
        let other = cache.fetch_with_dedup_ttl("k", TTL, || async {
            Ok::<_, MatchdayError>(String::from("never runs"))
        });

        let (leader, other, _) = tokio::join!(leader, other, async {
            tokio::task::yield_now().await;
            gate.add_permits(1);
        });

        assert_eq!(*leader.unwrap(), json!(1));
        assert!(matches!(other, Err(FetchError::TypeMismatch { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_during_flight_does_not_cancel_it() {
        let cache = TtlCache::new();
        let gate = Arc::new(Semaphore::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = cache.fetch_with_dedup_ttl(
            "k",
            TTL,
            gated_producer(calls, gate.clone(), Ok(json!("v"))),
        );

        let (result, _) = tokio::join!(fetch, async {
            tokio::task::yield_now().await;
            cache.clear(None);
            gate.add_permits(1);
        });

        assert_eq!(*result.unwrap(), json!("v"));
        assert!(cache.has("k"));
    }

    #[tokio::test]
    async fn test_producer_can_inspect_cache() {
        let cache = TtlCache::new();
        let observer = cache.clone();

        let fetch = cache.fetch_with_dedup("fixtures-live-all", move || {
            let pending = observer.is_pending("fixtures-live-all");
            let in_flight = observer.in_flight();
            let stats = observer.stats();
            async move { Ok::<_, MatchdayError>((pending, in_flight, stats.in_flight)) }
        });
        let seen = tokio::time::timeout(Duration::from_secs(5), fetch)
            .await
            .expect("producer deadlocked on the in-flight registry")
            .unwrap();

        assert_eq!(*seen, (true, 1, 1));
        assert!(!cache.is_pending("fixtures-live-all"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dedup_across_threads() {
        let cache = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let producer = gated_producer(calls.clone(), gate.clone(), Ok(json!("shared")));
                tokio::spawn(async move {
                    cache.fetch_with_dedup_ttl("leagues", TTL, producer).await
                })
            })
            .collect();

        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        // Let the remaining tasks attach before releasing the producer.
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.add_permits(1);

        for handle in handles {
            assert_eq!(*handle.await.unwrap().unwrap(), json!("shared"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight(), 0);
    }
}

//! Cache-backed services.
//!
//! Each service pairs an upstream source with the shared [`TtlCache`]. A read
//! first looks at the cache; on a miss it goes through
//! [`TtlCache::fetch_with_dedup_by`], so concurrent misses for one key share a
//! single upstream call and the value is stored with its resource's TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument};

use matchday_cache::TtlCache;
use matchday_core::clock::{Clock, SystemClock};
use matchday_core::constants::{
    DEFAULT_SEASON, LEAGUES_TTL, LIVE_FIXTURES_TTL, MATCH_DETAIL_TTL, NEWS_TTL, STANDINGS_TTL,
};
use matchday_core::error::{MatchdayError, Result};
use matchday_core::keys;
use matchday_core::traits::{ContentSource, SportsSource};

use crate::policy::{fixtures_by_date_ttl, parse_match_date};

/// A value served by a service, with where it came from.
#[derive(Debug)]
pub struct Cached<T> {
    /// The value, shared with the cache
    pub data: Arc<T>,
    /// True when no upstream call was made for this read
    pub from_cache: bool,
    /// Age of the cached value; zero for a fresh fetch
    pub age: Duration,
}

impl<T> Cached<T> {
    fn hit(data: Arc<T>, age: Duration) -> Self {
        Self {
            data,
            from_cache: true,
            age,
        }
    }

    fn fresh(data: Arc<T>) -> Self {
        Self {
            data,
            from_cache: false,
            age: Duration::ZERO,
        }
    }
}

impl<T> Clone for Cached<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            from_cache: self.from_cache,
            age: self.age,
        }
    }
}

/// Serves `key` from the cache, or fetches it once and stores it.
async fn load<F, Fut, P>(cache: &TtlCache, key: String, ttl_for: P, fetch: F) -> Result<Cached<Value>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
    P: FnOnce(&Value) -> Duration + Send + 'static,
{
    if let Some(hit) = cache.get_with_info::<Value>(&key) {
        debug!(key = %key, age_ms = hit.age.as_millis() as u64, "Cache hit");
        return Ok(Cached::hit(hit.data, hit.age));
    }

    debug!(key = %key, "Cache miss");
    let data = cache.fetch_with_dedup_by(&key, ttl_for, fetch).await?;
    Ok(Cached::fresh(data))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixtures, match detail, standings and leagues.
#[derive(Clone)]
pub struct SportsService {
    source: Arc<dyn SportsSource>,
    cache: TtlCache,
    clock: Arc<dyn Clock>,
}

impl SportsService {
    /// Creates a service over `source`, sharing `cache`.
    pub fn new(source: Arc<dyn SportsSource>, cache: TtlCache) -> Self {
        Self::with_clock(source, cache, SystemClock)
    }

    /// Creates a service whose notion of "today" comes from `clock`.
    pub fn with_clock(source: Arc<dyn SportsSource>, cache: TtlCache, clock: impl Clock) -> Self {
        Self {
            source,
            cache,
            clock: Arc::new(clock),
        }
    }

    /// The cache this service reads and fills.
    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Fixtures in play, cached for a minute.
    #[instrument(skip(self))]
    pub async fn fixtures_live(&self, live: &str) -> Result<Cached<Value>> {
        let source = Arc::clone(&self.source);
        let live = live.to_string();
        load(&self.cache, keys::fixtures_live(&live), |_| LIVE_FIXTURES_TTL, move || async move {
            info!(live = %live, "Fetching live fixtures");
            source.fixtures_live(&live).await
        })
        .await
    }

    /// Fixtures on `date` (`YYYY-MM-DD`).
    ///
    /// Finished days are cached for a day, days still in play for a minute.
    #[instrument(skip(self))]
    pub async fn fixtures_by_date(&self, date: &str) -> Result<Cached<Value>> {
        let day = parse_match_date(date)?;
        let today = self.clock.wall_clock().date_naive();
        let source = Arc::clone(&self.source);
        let date = date.to_string();
        load(
            &self.cache,
            keys::fixtures_by_date(&date),
            move |fixtures| fixtures_by_date_ttl(day, today, fixtures),
            move || async move {
                info!(date = %date, "Fetching fixtures by date");
                source.fixtures_by_date(&date).await
            },
        )
        .await
    }

    /// One fixture with events and lineups.
    #[instrument(skip(self))]
    pub async fn match_detail(&self, fixture_id: &str) -> Result<Cached<Value>> {
        let source = Arc::clone(&self.source);
        let fixture_id = fixture_id.to_string();
        load(&self.cache, keys::match_detail(&fixture_id), |_| MATCH_DETAIL_TTL, move || async move {
            info!(fixture_id = %fixture_id, "Fetching match detail");
            source.fixture(&fixture_id).await
        })
        .await
    }

    /// League table, cached for thirty minutes. `season` defaults to
    /// [`DEFAULT_SEASON`]. A league without a table is `NotFound` and is not
    /// cached.
    #[instrument(skip(self))]
    pub async fn standings(&self, league: &str, season: Option<&str>) -> Result<Cached<Value>> {
        let source = Arc::clone(&self.source);
        let league = league.to_string();
        let season = season.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SEASON).to_string();
        load(&self.cache, keys::standings(&league, &season), |_| STANDINGS_TTL, move || async move {
            info!(league = %league, season = %season, "Fetching standings");
            source
                .standings(&league, &season)
                .await?
                .ok_or_else(|| MatchdayError::NotFound(format!("standings for league {} season {}", league, season)))
        })
        .await
    }

    /// Leagues of the current season, cached for a day.
    #[instrument(skip(self))]
    pub async fn leagues(&self) -> Result<Cached<Value>> {
        let source = Arc::clone(&self.source);
        load(&self.cache, keys::leagues(), |_| LEAGUES_TTL, move || async move {
            info!("Fetching leagues");
            source.leagues().await
        })
        .await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NEWS
// ═══════════════════════════════════════════════════════════════════════════════

/// News posts from the content backend.
#[derive(Clone)]
pub struct NewsService {
    source: Arc<dyn ContentSource>,
    cache: TtlCache,
}

impl NewsService {
    /// Creates a service over `source`, sharing `cache`.
    pub fn new(source: Arc<dyn ContentSource>, cache: TtlCache) -> Self {
        Self { source, cache }
    }

    /// Most recent posts.
    #[instrument(skip(self))]
    pub async fn latest(&self) -> Result<Cached<Value>> {
        let source = Arc::clone(&self.source);
        load(&self.cache, keys::news_latest(), |_| NEWS_TTL, move || async move {
            info!("Fetching latest posts");
            source.latest_posts().await
        })
        .await
    }

    /// Every post.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Cached<Value>> {
        let source = Arc::clone(&self.source);
        load(&self.cache, keys::posts_all(), |_| NEWS_TTL, move || async move {
            info!("Fetching all posts");
            source.all_posts().await
        })
        .await
    }

    /// One post.
    #[instrument(skip(self))]
    pub async fn post(&self, post_id: &str) -> Result<Cached<Value>> {
        let source = Arc::clone(&self.source);
        let post_id = post_id.to_string();
        load(&self.cache, keys::post_detail(&post_id), |_| NEWS_TTL, move || async move {
            info!(post_id = %post_id, "Fetching post");
            source.post(&post_id).await
        })
        .await
    }

    /// Drops the cached post lists after a post was written.
    pub fn invalidate_lists(&self) {
        debug!("Invalidating post lists");
        self.cache.clear(Some(&keys::posts_all()));
        self.cache.clear(Some(&keys::news_latest()));
    }

    /// Drops one cached post and the lists that contain it.
    pub fn invalidate_post(&self, post_id: &str) {
        self.cache.clear(Some(&keys::post_detail(post_id)));
        self.invalidate_lists();
    }
}

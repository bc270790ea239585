//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info, warn};

use matchday_cache::CacheStats;
use matchday_core::error::{MatchdayError, Result as CoreResult};
use matchday_core::keys::LIVE_ALL;
use matchday_sports::Cached;
use serde_json::Value;

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// Serves an upstream list, degrading to an empty list when the upstream fails.
fn list_or_fallback(resource: &str, result: CoreResult<Cached<Value>>) -> Result<Json<Envelope>> {
    match result {
        Ok(cached) => Ok(Json(Envelope::from(cached))),
        Err(err @ MatchdayError::ValidationError(_)) => Err(err.into()),
        Err(err) => {
            warn!(resource, error = %err, "Serving empty fallback");
            Ok(Json(Envelope::fallback(format!("{} unavailable", resource))))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Fixtures
// ═══════════════════════════════════════════════════════════════════════════

/// GET /api/fixtures?date=YYYY-MM-DD
pub async fn fixtures_by_date(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FixturesQuery>,
) -> Result<Json<Envelope>> {
    let date = query
        .date
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::bad_request("date parameter is required (YYYY-MM-DD)"))?;

    list_or_fallback("fixtures", state.sports.fixtures_by_date(&date).await)
}

/// GET /api/fixtures/live?live=all
pub async fn fixtures_live(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveQuery>,
) -> Result<Json<Envelope>> {
    let live = query.live.filter(|l| !l.is_empty());
    let live = live.as_deref().unwrap_or(LIVE_ALL);

    list_or_fallback("live fixtures", state.sports.fixtures_live(live).await)
}

/// GET /api/matches/:id
pub async fn match_detail(
    State(state): State<Arc<AppState>>,
    Path(fixture_id): Path<String>,
) -> Result<Json<Envelope>> {
    let cached = state.sports.match_detail(&fixture_id).await?;
    Ok(Json(Envelope::from(cached)))
}

// ═══════════════════════════════════════════════════════════════════════════
// Standings & leagues
// ═══════════════════════════════════════════════════════════════════════════

/// GET /api/standings?leagueId=&season=
pub async fn standings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StandingsQuery>,
) -> Result<Json<Envelope>> {
    let league_id = query
        .league_id
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ApiError::bad_request("leagueId is required"))?;

    let cached = state.sports.standings(&league_id, query.season.as_deref()).await?;
    Ok(Json(Envelope::from(cached)))
}

/// GET /api/leagues
pub async fn leagues(State(state): State<Arc<AppState>>) -> Result<Json<Envelope>> {
    list_or_fallback("leagues", state.sports.leagues().await)
}

// ═══════════════════════════════════════════════════════════════════════════
// News
// ═══════════════════════════════════════════════════════════════════════════

/// GET /api/news/latest
pub async fn news_latest(State(state): State<Arc<AppState>>) -> Result<Json<Envelope>> {
    list_or_fallback("latest news", state.news.latest().await)
}

/// GET /api/news
pub async fn news_all(State(state): State<Arc<AppState>>) -> Result<Json<Envelope>> {
    list_or_fallback("news", state.news.all().await)
}

/// GET /api/news/:id
pub async fn news_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<Json<Envelope>> {
    let cached = state.news.post(&post_id).await?;
    Ok(Json(Envelope::from(cached)))
}

// ═══════════════════════════════════════════════════════════════════════════
// Cache administration
// ═══════════════════════════════════════════════════════════════════════════

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// GET /api/cache/:key
pub async fn cache_entry(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<CacheEntryResponse>> {
    let info = state
        .cache
        .get_info(&key)
        .ok_or_else(|| ApiError::not_found(format!("No live cache entry for '{}'", key)))?;
    Ok(Json(CacheEntryResponse::new(key, info)))
}

/// DELETE /api/cache/:key
///
/// Operator-only; mounted when `cache_admin` is enabled.
pub async fn clear_cache_key(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> StatusCode {
    debug!(key = %key, "Clearing cache entry");
    state.cache.clear(Some(&key));
    StatusCode::NO_CONTENT
}

/// DELETE /api/cache
///
/// Operator-only; mounted when `cache_admin` is enabled.
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    info!(entries = state.cache.len(), "Clearing cache");
    state.cache.clear(None);
    StatusCode::NO_CONTENT
}

// ═══════════════════════════════════════════════════════════════════════════
// Health
// ═══════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        cache_entries: state.cache.len(),
        in_flight: state.cache.in_flight(),
    })
}

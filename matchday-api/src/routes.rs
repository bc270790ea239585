//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
///
/// The cache purge routes (`DELETE /api/cache`, `DELETE /api/cache/:key`) are
/// operator-only and mounted only when [`ApiConfig::cache_admin`] is set.
///
/// [`ApiConfig::cache_admin`]: crate::ApiConfig::cache_admin
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin = state.config.cache_admin;

    let mut cache_entry = get(handlers::cache_entry);
    if admin {
        cache_entry = cache_entry.delete(handlers::clear_cache_key);
    }

    let router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Fixtures
        .route("/api/fixtures", get(handlers::fixtures_by_date))
        .route("/api/fixtures/live", get(handlers::fixtures_live))
        .route("/api/matches/:id", get(handlers::match_detail))

        // Standings & leagues
        .route("/api/standings", get(handlers::standings))
        .route("/api/leagues", get(handlers::leagues))

        // News
        .route("/api/news", get(handlers::news_all))
        .route("/api/news/latest", get(handlers::news_latest))
        .route("/api/news/:id", get(handlers::news_post))

        // Cache inspection
        .route("/api/cache/stats", get(handlers::cache_stats))
        .route("/api/cache/:key", cache_entry);

    // Cache purge
    let router = if admin {
        router.route("/api/cache", delete(handlers::clear_cache))
    } else {
        router
    };

    router.with_state(state)
}

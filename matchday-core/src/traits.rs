//! Upstream source traits.
//!
//! Services depend on these instead of on concrete HTTP clients, so the same
//! cache-backed logic runs against the real APIs or against in-memory doubles.
//! Payloads are opaque JSON.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// SPORTS DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Third-party sports-data API.
#[async_trait]
pub trait SportsSource: Send + Sync {
    /// Fixtures currently in play. `live` is `"all"` or a dash-separated list of league ids.
    async fn fixtures_live(&self, live: &str) -> Result<Value>;

    /// Fixtures scheduled on `date` (`YYYY-MM-DD`).
    async fn fixtures_by_date(&self, date: &str) -> Result<Value>;

    /// One fixture by id. Returns `NotFound` when the upstream has no such fixture.
    async fn fixture(&self, fixture_id: &str) -> Result<Value>;

    /// League table for a season. `None` when the upstream has no table.
    async fn standings(&self, league: &str, season: &str) -> Result<Option<Value>>;

    /// Leagues running in the current season.
    async fn leagues(&self) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT
// ═══════════════════════════════════════════════════════════════════════════════

/// First-party content backend (news posts).
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Most recent posts.
    async fn latest_posts(&self) -> Result<Value>;

    /// Every published post.
    async fn all_posts(&self) -> Result<Value>;

    /// One post by id. Returns `NotFound` when absent.
    async fn post(&self, post_id: &str) -> Result<Value>;
}

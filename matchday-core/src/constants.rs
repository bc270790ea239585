//! TTL constants and upstream defaults.
//!
//! The cache itself has a single configurable default TTL. The values below
//! are the per-resource policies applied by callers.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE TTLS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default TTL in milliseconds when a caller does not pass one.
pub const DEFAULT_TTL_MS: u64 = 60_000;

/// Default TTL when a caller does not pass one.
pub const DEFAULT_TTL: Duration = Duration::from_millis(DEFAULT_TTL_MS);

/// Live and upcoming fixtures change minute to minute.
pub const LIVE_FIXTURES_TTL: Duration = Duration::from_secs(60);

/// Fixtures that have all finished do not change anymore.
pub const FINISHED_FIXTURES_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Match detail (events, lineups).
pub const MATCH_DETAIL_TTL: Duration = Duration::from_secs(60);

/// League tables.
pub const STANDINGS_TTL: Duration = Duration::from_secs(30 * 60);

/// League catalogue, refreshed once a day.
pub const LEAGUES_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// News lists and post detail.
pub const NEWS_TTL: Duration = Duration::from_secs(60);

// ═══════════════════════════════════════════════════════════════════════════════
// UPSTREAM DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Season used when a standings request omits it.
pub const DEFAULT_SEASON: &str = "2022";

/// Fixture status codes that mean the match is over.
pub const FINISHED_STATUSES: &[&str] = &["FT", "AET", "PEN", "CANC", "ABD", "AWD", "WO"];

/// HTTP timeout for upstream calls, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 15;

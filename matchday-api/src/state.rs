//! App state: shared cache, services, config.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use matchday_cache::{CacheConfig, TtlCache};
use matchday_core::constants::{DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_TTL_MS};
use matchday_core::error::Result;
use matchday_core::traits::{ContentSource, SportsSource};
use matchday_sports::{
    ContentClient, ContentConfig, NewsService, SportsClient, SportsConfig, SportsService,
    DEFAULT_SPORTS_API_URL,
};

const DEFAULT_CORE_API_URL: &str = "http://localhost:8080";

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Sports-data API base URL
    pub sports_api_url: String,
    /// RapidAPI host header
    pub sports_api_host: Option<String>,
    /// RapidAPI key
    pub sports_api_key: Option<String>,
    /// Content backend base URL
    pub core_api_url: String,
    /// TTL used when a cache write does not pass one
    pub cache_default_ttl_ms: u64,
    /// Optional bound on cached entries
    pub cache_max_entries: Option<usize>,
    /// Upstream request timeout
    pub http_timeout_seconds: u64,
    /// Serve the `DELETE /api/cache` routes. Disable when clients are untrusted.
    pub cache_admin: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            sports_api_url: DEFAULT_SPORTS_API_URL.into(),
            sports_api_host: None,
            sports_api_key: None,
            core_api_url: DEFAULT_CORE_API_URL.into(),
            cache_default_ttl_ms: DEFAULT_TTL_MS,
            cache_max_entries: None,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            cache_admin: true,
        }
    }
}

impl ApiConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            sports_api_url: std::env::var("SPORTS_API_URL").unwrap_or(defaults.sports_api_url),
            sports_api_host: std::env::var("SPORTS_API_HOST").ok(),
            sports_api_key: std::env::var("SPORTS_API_KEY").ok(),
            core_api_url: std::env::var("CORE_API_URL").unwrap_or(defaults.core_api_url),
            cache_default_ttl_ms: env_parse("CACHE_DEFAULT_TTL_MS").unwrap_or(defaults.cache_default_ttl_ms),
            cache_max_entries: env_parse("CACHE_MAX_ENTRIES"),
            http_timeout_seconds: env_parse("HTTP_TIMEOUT_SECONDS").unwrap_or(defaults.http_timeout_seconds),
            cache_admin: env_parse("CACHE_ADMIN_ENABLED").unwrap_or(defaults.cache_admin),
        }
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            default_ttl_ms: self.cache_default_ttl_ms,
            max_entries: self.cache_max_entries,
        }
    }

    fn sports_config(&self) -> SportsConfig {
        let mut config = SportsConfig::new(&self.sports_api_url).with_timeout(self.http_timeout_seconds);
        config.api_host = self.sports_api_host.clone();
        config.api_key = self.sports_api_key.clone();
        config
    }

    fn content_config(&self) -> ContentConfig {
        ContentConfig::new(&self.core_api_url).with_timeout(self.http_timeout_seconds)
    }
}

/// Reads and parses an environment variable, ignoring it with a warning if malformed.
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, value = %raw, "Ignoring malformed environment variable");
            None
        }
    }
}

/// State shared by every handler.
pub struct AppState {
    /// Configuration the state was built from
    pub config: ApiConfig,
    /// The process-wide cache
    pub cache: TtlCache,
    /// Fixtures, standings, leagues
    pub sports: SportsService,
    /// News posts
    pub news: NewsService,
    /// Server start, for uptime
    pub started_at: Instant,
}

impl AppState {
    /// Builds the real upstream clients from `config`.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let sports = Arc::new(SportsClient::with_config(config.sports_config())?);
        let content = Arc::new(ContentClient::with_config(config.content_config())?);
        let cache = TtlCache::with_config(config.cache_config());
        Ok(Self::from_parts(config, cache, sports, content))
    }

    /// Assembles state from explicit parts.
    pub fn from_parts(
        config: ApiConfig,
        cache: TtlCache,
        sports: Arc<dyn SportsSource>,
        content: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            sports: SportsService::new(sports, cache.clone()),
            news: NewsService::new(content, cache.clone()),
            cache,
            config,
            started_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.cache_default_ttl_ms, 60_000);
        assert!(config.cache_max_entries.is_none());
        assert_eq!(config.cache_config().default_ttl_ms, 60_000);
        assert!(config.cache_admin);
    }

    #[test]
    fn test_env_parse() {
        std::env::set_var("MATCHDAY_TEST_MAX_ENTRIES", " 500 ");
        std::env::set_var("MATCHDAY_TEST_BAD_NUMBER", "lots");

        assert_eq!(env_parse::<usize>("MATCHDAY_TEST_MAX_ENTRIES"), Some(500));
        assert_eq!(env_parse::<usize>("MATCHDAY_TEST_BAD_NUMBER"), None);
        assert_eq!(env_parse::<usize>("MATCHDAY_TEST_UNSET"), None);
    }

    #[test]
    fn test_new_builds_clients() {
        let state = AppState::new(ApiConfig::default()).unwrap();
        assert!(state.cache.is_empty());
    }

    #[test]
    fn test_new_rejects_bad_url() {
        let config = ApiConfig {
            core_api_url: "::not a url::".into(),
            ..Default::default()
        };
        assert!(AppState::new(config).is_err());
    }
}

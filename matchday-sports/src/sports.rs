//! Sports-data API client.
//!
//! Talks to a RapidAPI-hosted football API. Every response is wrapped in an
//! envelope like `{"errors": [], "results": 3, "response": [...]}`; the client
//! checks `errors` and hands back `response` as opaque JSON.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use matchday_core::constants::DEFAULT_HTTP_TIMEOUT_SECONDS;
use matchday_core::error::{MatchdayError, Result};
use matchday_core::traits::SportsSource;

use crate::http::JsonHttp;

/// Default sports-data endpoint.
pub const DEFAULT_SPORTS_API_URL: &str = "https://api-football-v1.p.rapidapi.com/v3";

const RAPIDAPI_HOST_HEADER: &str = "x-rapidapi-host";
const RAPIDAPI_KEY_HEADER: &str = "x-rapidapi-key";

/// Sports-data client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SportsConfig {
    /// Base URL of the API
    pub base_url: String,
    /// Value of the `x-rapidapi-host` header
    pub api_host: Option<String>,
    /// Value of the `x-rapidapi-key` header
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for SportsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SPORTS_API_URL.into(),
            api_host: None,
            api_key: None,
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
        }
    }
}

impl SportsConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Adds RapidAPI credentials.
    pub fn with_credentials(mut self, api_host: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.api_host = Some(api_host.into());
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (RAPIDAPI_HOST_HEADER, &self.api_host),
            (RAPIDAPI_KEY_HEADER, &self.api_key),
        ] {
            if let Some(value) = value {
                let mut value = HeaderValue::from_str(value)
                    .map_err(|e| MatchdayError::ConfigError(format!("Invalid {} header: {}", name, e)))?;
                value.set_sensitive(name == RAPIDAPI_KEY_HEADER);
                headers.insert(HeaderName::from_static(name), value);
            }
        }
        Ok(headers)
    }
}

/// Client for the sports-data API.
#[derive(Clone, Debug)]
pub struct SportsClient {
    http: JsonHttp,
}

impl SportsClient {
    /// Creates a client for the given base URL without credentials.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(SportsConfig::new(base_url))
    }

    /// Creates a client with custom configuration.
    pub fn with_config(config: SportsConfig) -> Result<Self> {
        let headers = config.headers()?;
        Ok(Self {
            http: JsonHttp::new(&config.base_url, config.timeout_seconds, headers)?,
        })
    }

    async fn get_response(&self, path: &[&str], query: &[(&str, &str)]) -> Result<Value> {
        let body = self.http.get_json(self.http.endpoint(path), query).await?;
        unwrap_envelope(body)
    }
}

/// Extracts `response` from the API envelope, failing on reported errors.
fn unwrap_envelope(mut body: Value) -> Result<Value> {
    let has_errors = match body.get("errors") {
        Some(Value::Array(errors)) => !errors.is_empty(),
        Some(Value::Object(errors)) => !errors.is_empty(),
        _ => false,
    };
    if has_errors {
        return Err(MatchdayError::UpstreamRejected(body["errors"].to_string()));
    }

    match body.get_mut("response") {
        Some(response) => Ok(response.take()),
        None => Ok(body),
    }
}

/// First element of a `response` array, if any.
fn first(response: Value) -> Option<Value> {
    match response {
        Value::Array(items) => items.into_iter().next(),
        Value::Null => None,
        other => Some(other),
    }
}

#[async_trait]
impl SportsSource for SportsClient {
    #[instrument(skip(self))]
    async fn fixtures_live(&self, live: &str) -> Result<Value> {
        self.get_response(&["fixtures"], &[("live", live)]).await
    }

    #[instrument(skip(self))]
    async fn fixtures_by_date(&self, date: &str) -> Result<Value> {
        self.get_response(&["fixtures"], &[("date", date)]).await
    }

    #[instrument(skip(self))]
    async fn fixture(&self, fixture_id: &str) -> Result<Value> {
        let response = self.get_response(&["fixtures"], &[("id", fixture_id)]).await?;
        first(response).ok_or_else(|| MatchdayError::NotFound(format!("fixture {}", fixture_id)))
    }

    #[instrument(skip(self))]
    async fn standings(&self, league: &str, season: &str) -> Result<Option<Value>> {
        let response = self
            .get_response(&["standings"], &[("league", league), ("season", season)])
            .await?;
        let table = first(response);
        if table.is_none() {
            debug!(league, season, "No standings published");
        }
        Ok(table)
    }

    #[instrument(skip(self))]
    async fn leagues(&self) -> Result<Value> {
        self.get_response(&["leagues"], &[("current", "true")]).await
    }
}

//! HTTP plumbing shared by the upstream clients.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;
use url::Url;

use matchday_core::error::{MatchdayError, Result};

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Thin JSON-over-HTTP client bound to one base URL.
#[derive(Clone, Debug)]
pub(crate) struct JsonHttp {
    base_url: Url,
    timeout_seconds: u64,
    client: reqwest::Client,
}

impl JsonHttp {
    pub(crate) fn new(base_url: &str, timeout_seconds: u64, headers: HeaderMap) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MatchdayError::ConfigError(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(MatchdayError::ConfigError(format!(
                "Base URL '{}' cannot carry a path",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| MatchdayError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            timeout_seconds,
            client,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GETs `url` and parses the body as JSON.
    ///
    /// 404 becomes `NotFound`, any other non-2xx becomes `UpstreamStatus`.
    pub(crate) async fn get_json(&self, url: Url, query: &[(&str, &str)]) -> Result<Value> {
        debug!(url = %url, ?query, "GET");

        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MatchdayError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate(&mut body, MAX_ERROR_BODY);
            return Err(MatchdayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn transport_error(&self, err: reqwest::Error) -> MatchdayError {
        if err.is_timeout() {
            MatchdayError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else {
            MatchdayError::HttpError(err.to_string())
        }
    }
}

fn truncate(body: &mut String, max: usize) {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let http = JsonHttp::new("https://api.example.com/v3/", 5, HeaderMap::new()).unwrap();
        let url = http.endpoint(&["fixtures"]);
        assert_eq!(url.as_str(), "https://api.example.com/v3/fixtures");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let http = JsonHttp::new("https://core.example.com", 5, HeaderMap::new()).unwrap();
        let url = http.endpoint(&["api", "posts", "a b/c"]);
        assert_eq!(url.as_str(), "https://core.example.com/api/posts/a%20b%2Fc");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = JsonHttp::new("not a url", 5, HeaderMap::new()).unwrap_err();
        assert!(matches!(err, MatchdayError::ConfigError(_)));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let mut body = "é".repeat(10);
        truncate(&mut body, 5);
        assert_eq!(body, "éé");
    }
}

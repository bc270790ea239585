//! Content backend client (news posts).
//!
//! The backend wraps every payload as `{"code": "000", "message": ..., "data": ...}`.
//! Any other `code` is a rejection.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use matchday_core::constants::DEFAULT_HTTP_TIMEOUT_SECONDS;
use matchday_core::error::{MatchdayError, Result};
use matchday_core::traits::ContentSource;

use crate::http::JsonHttp;

/// Response code the content backend uses for success.
pub const API_SUCCESS: &str = "000";

/// Content backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Base URL of the backend
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl ContentConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Client for the content backend.
#[derive(Clone, Debug)]
pub struct ContentClient {
    http: JsonHttp,
}

impl ContentClient {
    /// Creates a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(ContentConfig::new(base_url))
    }

    /// Creates a client with custom configuration.
    pub fn with_config(config: ContentConfig) -> Result<Self> {
        Ok(Self {
            http: JsonHttp::new(&config.base_url, config.timeout_seconds, HeaderMap::new())?,
        })
    }

    async fn get_data(&self, path: &[&str]) -> Result<Value> {
        let body = self.http.get_json(self.http.endpoint(path), &[]).await?;
        unwrap_envelope(body)
    }
}

#[derive(Deserialize)]
struct Envelope {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

fn unwrap_envelope(body: Value) -> Result<Value> {
    let envelope: Envelope = serde_json::from_value(body)?;
    match envelope.code.as_deref() {
        Some(API_SUCCESS) => Ok(envelope.data),
        code => Err(MatchdayError::UpstreamRejected(format!(
            "code {}: {}",
            code.unwrap_or("<missing>"),
            envelope.message.unwrap_or_default()
        ))),
    }
}

#[async_trait]
impl ContentSource for ContentClient {
    #[instrument(skip(self))]
    async fn latest_posts(&self) -> Result<Value> {
        self.get_data(&["api", "posts", "latest"]).await
    }

    #[instrument(skip(self))]
    async fn all_posts(&self) -> Result<Value> {
        self.get_data(&["api", "posts"]).await
    }

    #[instrument(skip(self))]
    async fn post(&self, post_id: &str) -> Result<Value> {
        let data = self.get_data(&["api", "posts", post_id]).await?;
        if data.is_null() {
            return Err(MatchdayError::NotFound(format!("post {}", post_id)));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_latest_posts_extracts_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/posts/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "000",
                "message": "ok",
                "data": [{"id": 7, "title": "Derby day"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ContentClient::new(server.uri()).unwrap();
        let posts = client.latest_posts().await.unwrap();

        assert_eq!(posts[0]["title"], "Derby day");
    }

    #[tokio::test]
    async fn test_rejected_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"code": "401", "message": "expired token"})),
            )
            .mount(&server)
            .await;

        let err = ContentClient::new(server.uri()).unwrap().all_posts().await.unwrap_err();
        assert!(matches!(err, MatchdayError::UpstreamRejected(msg) if msg.contains("expired token")));
    }

    #[tokio::test]
    async fn test_missing_post() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/posts/99"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/posts/100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "000", "data": null})))
            .mount(&server)
            .await;

        let client = ContentClient::new(server.uri()).unwrap();
        assert!(client.post("99").await.unwrap_err().is_not_found());
        assert!(client.post("100").await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_envelope_without_code_is_rejected() {
        let err = unwrap_envelope(json!({"data": []})).unwrap_err();
        assert!(matches!(err, MatchdayError::UpstreamRejected(msg) if msg.contains("<missing>")));
    }
}

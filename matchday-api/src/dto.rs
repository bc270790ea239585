//! DTOs for API requests and responses.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use matchday_cache::EntryInfo;
use matchday_sports::Cached;

/// Response envelope for every data route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// False when the upstream failed and `data` is a fallback
    pub success: bool,
    /// Payload, opaque upstream JSON
    pub data: Arc<Value>,
    /// True when served without an upstream call
    pub from_cache: bool,
    /// Age of the cached value, present on cache hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_ms: Option<u64>,
    /// Why the fallback was served
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    /// Empty-list payload served when an upstream list fails.
    pub fn fallback(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Arc::new(Value::Array(Vec::new())),
            from_cache: false,
            cache_age_ms: None,
            message: Some(message.into()),
        }
    }
}

impl From<Cached<Value>> for Envelope {
    fn from(cached: Cached<Value>) -> Self {
        Self {
            success: true,
            cache_age_ms: cached.from_cache.then(|| cached.age.as_millis() as u64),
            data: cached.data,
            from_cache: cached.from_cache,
            message: None,
        }
    }
}

/// Query for `GET /api/fixtures`.
#[derive(Debug, Deserialize)]
pub struct FixturesQuery {
    /// Match date, `YYYY-MM-DD`
    pub date: Option<String>,
}

/// Query for `GET /api/fixtures/live`.
#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    /// `all` or dash-separated league ids
    pub live: Option<String>,
}

/// Query for `GET /api/standings`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsQuery {
    /// League id
    pub league_id: Option<String>,
    /// Season year
    pub season: Option<String>,
}

/// Metadata of one cache entry.
#[derive(Debug, Serialize)]
pub struct CacheEntryResponse {
    /// Cache key
    pub key: String,
    /// When the value was stored
    pub timestamp: DateTime<Utc>,
    /// Time since it was stored
    pub age_ms: u64,
    /// TTL it was stored with
    pub ttl_ms: u64,
    /// Time left before it expires
    pub remaining_ms: u64,
}

impl CacheEntryResponse {
    /// Builds the response for `key` from its entry metadata.
    pub fn new(key: String, info: EntryInfo) -> Self {
        Self {
            key,
            timestamp: info.timestamp,
            age_ms: info.age.as_millis() as u64,
            ttl_ms: info.ttl.as_millis() as u64,
            remaining_ms: info.remaining().as_millis() as u64,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Entries currently stored in the cache
    pub cache_entries: usize,
    /// Upstream fetches in flight
    pub in_flight: usize,
}

//! Error types for Matchday.
//!
//! Two layers live here:
//!
//! - [`FetchError`]: the outcome of a failed deduplicated fetch. It is `Clone`
//!   so that one failure can be handed to every caller waiting on the same key.
//! - [`MatchdayError`]: everything else (upstream HTTP, JSON, validation,
//!   configuration), built with `thiserror`.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias using `MatchdayError`.
pub type Result<T> = std::result::Result<T, MatchdayError>;

/// Type-erased producer error shared between all waiters of one fetch.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Failure of a deduplicated fetch.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The producer for `key` failed. Every waiter receives the same error.
    #[error("Fetch for '{key}' failed: {source}")]
    Producer {
        /// Cache key the producer was filling.
        key: String,
        /// The producer's own error, untouched.
        source: SharedError,
    },

    /// The in-flight value for `key` was produced with a different type than requested.
    #[error("Cached value for '{key}' is not a {expected}")]
    TypeMismatch {
        /// Cache key.
        key: String,
        /// Name of the type the caller asked for.
        expected: &'static str,
    },
}

impl FetchError {
    /// Wraps a producer error for `key`.
    pub fn producer<E>(key: impl Into<String>, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        FetchError::Producer {
            key: key.into(),
            source: Arc::new(err),
        }
    }

    /// Cache key this failure belongs to.
    pub fn key(&self) -> &str {
        match self {
            FetchError::Producer { key, .. } | FetchError::TypeMismatch { key, .. } => key,
        }
    }

    /// Downcasts the producer's error to a concrete type.
    pub fn producer_error<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            FetchError::Producer { source, .. } => source.downcast_ref::<E>(),
            FetchError::TypeMismatch { .. } => None,
        }
    }
}

/// Main error type for Matchday operations.
#[derive(Debug, Error)]
pub enum MatchdayError {
    // ═══════════════════════════════════════════════════════════════════════════
    // UPSTREAM ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Upstream answered 200 but reported errors in its envelope.
    #[error("Upstream rejected the request: {0}")]
    UpstreamRejected(String),

    /// Upstream has no such resource.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request timed out.
    #[error("Request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // CACHE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A deduplicated fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl MatchdayError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            MatchdayError::HttpError(_) | MatchdayError::Timeout { .. } => true,
            MatchdayError::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            MatchdayError::Fetch(err) => err
                .producer_error::<MatchdayError>()
                .map(MatchdayError::is_recoverable)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Returns true if the resource does not exist upstream.
    ///
    /// Looks through a failed deduplicated fetch at the producer's error.
    pub fn is_not_found(&self) -> bool {
        match self {
            MatchdayError::NotFound(_) => true,
            MatchdayError::UpstreamStatus { status, .. } => *status == 404,
            MatchdayError::Fetch(err) => err
                .producer_error::<MatchdayError>()
                .map(MatchdayError::is_not_found)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Returns true if the failure came from an upstream service.
    pub fn is_upstream_error(&self) -> bool {
        match self {
            MatchdayError::HttpError(_)
            | MatchdayError::UpstreamStatus { .. }
            | MatchdayError::UpstreamRejected(_)
            | MatchdayError::Timeout { .. }
            | MatchdayError::JsonError(_) => true,
            MatchdayError::Fetch(err) => err
                .producer_error::<MatchdayError>()
                .map(MatchdayError::is_upstream_error)
                .unwrap_or(true),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MatchdayError::UpstreamStatus {
            status: 503,
            body: "maintenance".into(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("maintenance"));
    }

    #[test]
    fn test_error_classification() {
        assert!(MatchdayError::HttpError("reset".into()).is_recoverable());
        assert!(MatchdayError::Timeout { seconds: 10 }.is_recoverable());
        assert!(!MatchdayError::ValidationError("bad date".into()).is_recoverable());

        assert!(MatchdayError::NotFound("fixture 1".into()).is_not_found());
        assert!(MatchdayError::UpstreamStatus { status: 404, body: String::new() }.is_not_found());
        assert!(!MatchdayError::HttpError("x".into()).is_not_found());
    }

    #[test]
    fn test_fetch_error_sees_through_producer() {
        let inner = MatchdayError::NotFound("match-detail-9".into());
        let err = MatchdayError::from(FetchError::producer("match-detail-9", inner));

        assert!(err.is_not_found());
        assert!(!err.is_upstream_error());
        assert!(err.to_string().contains("match-detail-9"));
    }

    #[test]
    fn test_fetch_error_clones_share_source() {
        let err = FetchError::producer("k", MatchdayError::HttpError("boom".into()));
        let copy = err.clone();

        match (&err, &copy) {
            (FetchError::Producer { source: a, .. }, FetchError::Producer { source: b, .. }) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("expected producer errors"),
        }
        assert_eq!(copy.key(), "k");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let result: Result<serde_json::Value> = json_result.map_err(MatchdayError::from);
        assert!(matches!(result, Err(MatchdayError::JsonError(_))));
    }
}

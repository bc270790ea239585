//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use matchday_core::error::MatchdayError;

/// Machine-readable error code, serialized as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or malformed request parameter
    BadRequest,
    /// Nothing exists under the requested id
    NotFound,
    /// The sports or content backend failed
    UpstreamError,
    /// Anything else; details stay in the server log
    InternalError,
}

impl ErrorCode {
    /// HTTP status sent with this code.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error returned by handlers, rendered as `{"error": {"code", "message"}}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Rejects a request parameter.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::BadRequest, message)
    }

    /// Reports a missing resource.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::NotFound, message)
    }

    /// Error code of this error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self }))).into_response()
    }
}

impl From<MatchdayError> for ApiError {
    fn from(err: MatchdayError) -> Self {
        let code = match &err {
            MatchdayError::ValidationError(_) => ErrorCode::BadRequest,
            _ if err.is_not_found() => ErrorCode::NotFound,
            _ if err.is_upstream_error() => {
                tracing::warn!(error = %err, "Upstream failure");
                ErrorCode::UpstreamError
            }
            _ => {
                tracing::error!(error = %err, "Internal error");
                return Self::with_code(ErrorCode::InternalError, "An internal error occurred");
            }
        };
        Self::with_code(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchday_core::error::FetchError;
    use serde_json::{json, Value};

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MatchdayError::ValidationError("bad date".into()), ErrorCode::BadRequest),
            (MatchdayError::NotFound("fixture 1".into()), ErrorCode::NotFound),
            (MatchdayError::Timeout { seconds: 15 }, ErrorCode::UpstreamError),
            (MatchdayError::UpstreamRejected("quota".into()), ErrorCode::UpstreamError),
            (MatchdayError::ConfigError("no url".into()), ErrorCode::InternalError),
        ];
        for (err, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.code(), code);
            assert_eq!(api.status(), code.status());
        }
    }

    #[test]
    fn test_fetch_failure_keeps_producer_status() {
        let err = MatchdayError::from(FetchError::producer(
            "post-detail-9",
            MatchdayError::NotFound("post 9".into()),
        ));
        assert_eq!(ApiError::from(err).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let (status, body) = render(ApiError::from(MatchdayError::Timeout { seconds: 15 })).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("15"));

        let (status, body) = render(ApiError::from(MatchdayError::ConfigError("API key".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"error": {"code": "INTERNAL_ERROR", "message": "An internal error occurred"}})
        );
    }
}

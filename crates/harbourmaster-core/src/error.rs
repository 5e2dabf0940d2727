//! Failure taxonomy of a forwarded request.
//!
//! Every variant reaches the original HTTP caller; none is swallowed.
//!
//! | Variant             | Caller status         | Upstream call made |
//! |---------------------|-----------------------|--------------------|
//! | `MissingParameter`  | 400                   | no                 |
//! | `Upstream`          | engine's own status   | yes                |
//! | `MalformedResponse` | 500                   | yes                |
//! | `Transport`         | 502                   | attempted          |

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hyper::body::Bytes;
use serde::Deserialize;

use crate::types::ErrorResponse;

/// Errors from translating or forwarding a request to the engine.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("missing required parameter `{0}`: an engine URL is required")]
    MissingParameter(&'static str),

    #[error("engine returned {status}")]
    Upstream { status: StatusCode, body: Bytes },

    #[error("engine returned {status} with a body that is not JSON: {source}")]
    MalformedResponse {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    #[error("engine transport failed: {0}")]
    Transport(String),
}

/// The engine's own error body shape.
#[derive(Deserialize)]
struct EngineMessage {
    message: String,
}

impl ProxyError {
    /// Stable machine-readable kind, used in error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "missing_parameter",
            Self::Upstream { .. } => "upstream_error",
            Self::MalformedResponse { .. } => "malformed_upstream_response",
            Self::Transport(_) => "transport_failure",
        }
    }

    /// HTTP status returned to the original caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::MalformedResponse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Human-readable message for the caller.
    ///
    /// For engine failures this prefers the engine's `{"message": ...}`,
    /// then the raw body text, then the status line.
    pub fn message(&self) -> String {
        match self {
            Self::Upstream { body, .. } if !body.is_empty() => {
                match serde_json::from_slice::<EngineMessage>(body) {
                    Ok(engine) => engine.message,
                    Err(_) => String::from_utf8_lossy(body).trim().to_string(),
                }
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.message(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn body_of(err: ProxyError) -> (StatusCode, ErrorResponse) {
        let resp = err.into_response();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_missing_parameter_is_bad_request() {
        let (status, body) = body_of(ProxyError::MissingParameter("url")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "missing_parameter");
        assert!(body.message.contains("`url`"));
        assert_eq!(body.status, 400);
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_engine_status_and_message() {
        let err = ProxyError::Upstream {
            status: StatusCode::NOT_FOUND,
            body: Bytes::from_static(br#"{"message":"No such container: xyz"}"#),
        };
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "upstream_error");
        assert_eq!(body.message, "No such container: xyz");
        assert_eq!(body.status, 404);
    }

    #[test]
    fn test_upstream_message_falls_back_to_raw_text() {
        let err = ProxyError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Bytes::from_static(b"engine exploded\n"),
        };
        assert_eq!(err.message(), "engine exploded");
    }

    #[test]
    fn test_upstream_message_without_body_uses_status() {
        let err = ProxyError::Upstream {
            status: StatusCode::CONFLICT,
            body: Bytes::new(),
        };
        assert_eq!(err.message(), "engine returned 409 Conflict");
    }

    #[tokio::test]
    async fn test_malformed_and_transport_are_server_errors() {
        let source = serde_json::from_slice::<serde_json::Value>(b"<html>").unwrap_err();
        let malformed = ProxyError::MalformedResponse {
            status: StatusCode::OK,
            source,
        };
        let (status, body) = body_of(malformed).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "malformed_upstream_response");

        let (status, body) = body_of(ProxyError::Transport("connection reset".into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "transport_failure");
        assert_eq!(body.message, "engine transport failed: connection reset");
    }
}

//! Application error types and the uniform error envelope
//!
//! Every handler returns [`AppResult`]. Client-caused failures render as
//! `{"status": "fail"}` with a 4xx code, upstream and internal failures as
//! `{"status": "error"}` with a 5xx code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// Result type used across handlers, providers and the composition layer
pub type AppResult<T> = Result<T, AppError>;

/// Failures reported by an upstream payment gateway
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalError {
    /// The gateway could not be reached or answered with a non-2xx status
    #[error("{provider} transport error: {message}")]
    Transport {
        provider: String,
        status: Option<u16>,
        message: String,
    },
    /// The gateway answered 2xx but its embedded status rejected the request
    #[error("{provider} rejected the request (code {code:?}): {message:?}")]
    Rejected {
        provider: String,
        code: Option<String>,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppErrorKind {
    /// Missing or malformed input, detected before any network call
    #[error("Validation error: {message}")]
    Validation { message: String },
    #[error(transparent)]
    External(ExternalError),
    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct AppError {
    pub kind: AppErrorKind,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self { kind }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation {
            message: message.into(),
        })
    }

    pub fn transport(
        provider: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(AppErrorKind::External(ExternalError::Transport {
            provider: provider.into(),
            status,
            message: message.into(),
        }))
    }

    pub fn rejected(
        provider: impl Into<String>,
        code: Option<String>,
        message: Option<String>,
    ) -> Self {
        Self::new(AppErrorKind::External(ExternalError::Rejected {
            provider: provider.into(),
            code,
            message,
        }))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Internal {
            message: message.into(),
        })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, AppErrorKind::Validation { .. })
    }

    /// HTTP status the error is rendered with.
    ///
    /// Transport failures keep the upstream status when it is an error code;
    /// a request that never produced a response maps to 500.
    pub fn status(&self) -> StatusCode {
        match &self.kind {
            AppErrorKind::Validation { .. } => StatusCode::BAD_REQUEST,
            AppErrorKind::External(ExternalError::Transport { status, .. }) => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppErrorKind::External(ExternalError::Rejected { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppErrorKind::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message, without the provider prefix used in logs
    pub fn message(&self) -> Option<&str> {
        let message = match &self.kind {
            AppErrorKind::Validation { message } => Some(message.as_str()),
            AppErrorKind::External(ExternalError::Transport { message, .. }) => {
                Some(message.as_str())
            }
            AppErrorKind::External(ExternalError::Rejected { message, .. }) => message.as_deref(),
            AppErrorKind::Internal { message } => Some(message.as_str()),
        };
        message.filter(|m| !m.is_empty())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::internal(format!("JSON error: {}", err))
    }
}

/// Outward error shape shared by every route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub error: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(message: Option<String>, status: StatusCode) -> Self {
        let label = if status.as_u16() < 500 { "fail" } else { "error" };
        Self {
            status: label.to_string(),
            error: message.filter(|m| !m.is_empty()),
        }
    }
}

/// Build an error response from a nullable message and a numeric status.
///
/// Unknown or out-of-range codes fall back to 500.
pub fn error_response(message: Option<String>, status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorEnvelope::new(message, status))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            debug!(status = status.as_u16(), "Request rejected: {}", self);
        }
        error_response(self.message().map(str::to_string), status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn envelope_of(response: Response) -> (StatusCode, ErrorEnvelope) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 8 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors_render_as_fail() {
        let (status, body) = envelope_of(error_response(Some("Missing amount".into()), 400)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.status, "fail");
        assert_eq!(body.error.as_deref(), Some("Missing amount"));
    }

    #[tokio::test]
    async fn test_server_errors_render_as_error_with_null_message() {
        let (status, body) = envelope_of(error_response(None, 500)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.status, "error");
        assert_eq!(body.error, None);
    }

    #[tokio::test]
    async fn test_invalid_status_falls_back_to_500() {
        let (status, body) = envelope_of(error_response(Some("boom".into()), 42)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.status, "error");
    }

    #[test]
    fn test_transport_status_is_preserved() {
        let err = AppError::transport("WaafiPay", Some(503), "Service Unavailable");
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), Some("Service Unavailable"));

        let err = AppError::transport("WaafiPay", None, "connection refused");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::transport("WaafiPay", Some(302), "Found");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rejection_is_500_and_keeps_gateway_message() {
        let err = AppError::rejected("WaafiPay", Some("5310".into()), Some("Payment declined".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), Some("Payment declined"));

        let err = AppError::rejected("WaafiPay", None, Some(String::new()));
        assert_eq!(err.message(), None);
    }

    #[tokio::test]
    async fn test_app_error_into_response() {
        let (status, body) = envelope_of(AppError::validation("API key is not valid").into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            ErrorEnvelope {
                status: "fail".into(),
                error: Some("API key is not valid".into()),
            }
        );
    }
}

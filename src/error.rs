//! Error types for the borrow service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    Forbidden = 3,
    MissingSession = 4,
    NoSuchData = 5,
    BadValue = 6,
    StateConflict = 7,
    UpstreamFailure = 8,
    MalformedResponse = 9,
}

/// How a failure should be surfaced to the person who triggered it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// User-facing message derived from a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }
}

const GENERIC_UPSTREAM_MESSAGE: &str = "The library service could not be reached, please try again";

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// Raised before any network call (missing token, nothing loaded)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The request is not in a state that allows the operation
    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Malformed upstream response: {0}")]
    Parse(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AppError {
    /// Build a state conflict from a status pair
    pub fn conflict(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        AppError::StateConflict(format!("cannot move request from '{}' to '{}'", from, to))
    }

    /// Presentation mapping shared by every caller
    pub fn notice(&self) -> Notice {
        match self {
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::Precondition(msg)
            | AppError::Validation(msg)
            | AppError::StateConflict(msg)
            | AppError::NotFound(msg) => Notice::error(msg.clone()),
            AppError::Upstream(_) | AppError::Parse(_) => Notice::error(GENERIC_UPSTREAM_MESSAGE),
            AppError::Internal(_) | AppError::Config(_) => Notice::error("Something went wrong"),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::Parse(e.to_string())
        } else {
            AppError::Upstream(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Parse(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    pub severity: Severity,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            AppError::Precondition(_) => {
                (StatusCode::PRECONDITION_REQUIRED, ErrorCode::MissingSession)
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::StateConflict(msg) => {
                tracing::warn!("State conflict: {}", msg);
                (StatusCode::CONFLICT, ErrorCode::StateConflict)
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, ErrorCode::UpstreamFailure)
            }
            AppError::Parse(msg) => {
                tracing::error!("Malformed upstream response: {}", msg);
                (StatusCode::BAD_GATEWAY, ErrorCode::MalformedResponse)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure)
            }
            AppError::Config(e) => {
                tracing::error!("Configuration error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure)
            }
        };

        let notice = self.notice();
        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message: notice.message,
            severity: notice.severity,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_is_verbatim() {
        let err = AppError::StateConflict("Request is no longer pending".to_string());
        assert_eq!(err.notice(), Notice::error("Request is no longer pending"));
    }

    #[test]
    fn test_transport_errors_use_generic_message() {
        let notice = AppError::Parse("expected value at line 1".to_string()).notice();
        assert_eq!(notice.severity, Severity::Error);
        assert_eq!(notice.message, GENERIC_UPSTREAM_MESSAGE);
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Precondition("no token".into()), StatusCode::PRECONDITION_REQUIRED),
            (AppError::StateConflict("x".into()), StatusCode::CONFLICT),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Authorization("x".into()), StatusCode::FORBIDDEN),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}

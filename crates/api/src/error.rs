//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. Every response body is structured JSON
//! (`{"error": "..."}`) so the front-end never has to parse a bare string,
//! and internal detail (provider responses, SQL errors, tokens) never
//! reaches the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;
use crate::services::token_links::LinkError;

/// Application-level error type for the API handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing request fields.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The supplied token does not match a live, unexpired record.
    /// Deliberately covers both "not found" and "expired" so callers
    /// cannot probe which tokens exist.
    #[error("Token is invalid or expired")]
    TokenInvalid,

    /// Request origin is not on the allow-list.
    #[error("Origin not allowed")]
    OriginNotAllowed,

    /// HTTP method not supported on this route.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Missing or invalid service credentials on an internal route.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to persist a reset token.
    #[error("Token save failed: {0}")]
    TokenSave(#[source] RepositoryError),

    /// Failed to apply the password update during redemption.
    #[error("Password update failed: {0}")]
    PasswordUpdate(#[source] RepositoryError),

    /// The internal token-link call failed or returned non-success.
    #[error("Link generation failed: {0}")]
    LinkGeneration(#[source] LinkError),

    /// The internal token-link call returned something that is not an
    /// http/https URL.
    #[error("Invalid reset link returned")]
    InvalidLink,

    /// The email provider call failed.
    #[error("Email delivery failed: {0}")]
    Delivery(#[source] EmailError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::TokenInvalid => StatusCode::BAD_REQUEST,
            Self::OriginNotAllowed => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::TokenSave(_)
            | Self::PasswordUpdate(_)
            | Self::LinkGeneration(_)
            | Self::InvalidLink
            | Self::Delivery(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The short, client-safe message placed in the JSON body.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::BadRequest(msg) | Self::Unauthorized(msg) => msg.as_str(),
            Self::TokenInvalid => "Token is invalid or expired",
            Self::OriginNotAllowed => "Origin not allowed",
            Self::MethodNotAllowed => "Method not allowed",
            Self::TokenSave(_) => "Could not save token",
            Self::PasswordUpdate(_) => "Could not update password",
            Self::LinkGeneration(_) => "Failed to generate password reset link",
            Self::InvalidLink => "Invalid reset link returned",
            Self::Delivery(_) => "Email delivery failed",
            Self::Internal(_) => "Unhandled server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry; the full error chain stays in
        // the logs, only the public message leaves the process.
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({ "error": self.public_message() });
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::BadRequest("Missing email".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::TokenInvalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::OriginNotAllowed.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            AppError::Unauthorized("nope".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidLink.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_expired_and_missing_tokens_share_a_message() {
        // Callers must not be able to distinguish the two cases.
        assert_eq!(
            AppError::TokenInvalid.public_message(),
            "Token is invalid or expired"
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::Internal("connection refused to 10.0.0.5".into());
        assert_eq!(err.public_message(), "Unhandled server error");

        let err = AppError::InvalidLink;
        assert_eq!(err.public_message(), "Invalid reset link returned");
    }

    #[test]
    fn test_json_error_body() {
        let response = AppError::TokenInvalid.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .unwrap();
        assert!(content_type.to_str().unwrap().starts_with("application/json"));
    }
}

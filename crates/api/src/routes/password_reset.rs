//! Reset-email dispatch handler (public).
//!
//! Validates the caller's email, fetches a tokenized URL from the internal
//! token-link route, and mails it. The URL and token never appear in the
//! response: the link must reach only the verified inbox.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use owner_report_core::Email;

use crate::error::{AppError, Result};
use crate::redact::mask_email;
use crate::services::token_links::LinkError;
use crate::state::AppState;

/// Dispatch request body.
#[derive(Debug, Default, Deserialize)]
struct PasswordResetRequest {
    #[serde(default)]
    email: Option<String>,
}

/// Send a password setup/reset email.
///
/// `POST /api/password-reset` with `{"email": "..."}`. Responds
/// `{"success": true}` without echoing the link.
#[instrument(skip(state, body))]
pub async fn send_reset_email(State(state): State<AppState>, body: String) -> Result<Json<Value>> {
    // An unparseable body is treated the same as a missing email.
    let request: PasswordResetRequest = serde_json::from_str(&body).unwrap_or_default();
    let raw_email = request.email.as_deref().unwrap_or("").trim().to_owned();

    if raw_email.is_empty() {
        return Err(AppError::BadRequest("Missing email".to_string()));
    }

    let Ok(email) = Email::parse(&raw_email) else {
        tracing::warn!(email = %mask_email(&raw_email), "Rejected malformed email");
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    };

    tracing::debug!(email = %mask_email(email.as_str()), "Requesting reset link");

    let reset_url = state
        .token_links()
        .fetch_reset_url(email.as_str())
        .await
        .map_err(|e| match e {
            LinkError::InvalidUrl { .. } => AppError::InvalidLink,
            other => AppError::LinkGeneration(other),
        })?;

    state
        .email()
        .send_reset_link(email.as_str(), &reset_url)
        .await
        .map_err(AppError::Delivery)?;

    tracing::info!(email = %mask_email(email.as_str()), "Reset email sent");

    Ok(Json(json!({ "success": true })))
}

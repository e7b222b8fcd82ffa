//! Token-link issuance handler (internal).
//!
//! Generates a short-lived single-use token for an email, persists it
//! (overwriting any earlier token for that address), and returns the
//! tokenized set-password URL. No email is sent here; delivery is the
//! caller's responsibility.

use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;
use uuid::Uuid;

use crate::db::ResetTokenRepository;
use crate::error::{AppError, Result};
use crate::redact::{mask_email, safe_url};
use crate::state::AppState;

/// How long an issued token stays valid.
const TOKEN_TTL_MINUTES: i64 = 30;

/// Issuance request body.
#[derive(Debug, Default, Deserialize)]
struct TokenLinkRequest {
    #[serde(default)]
    email: Option<String>,
}

/// Issue a tokenized set-password URL for an email.
///
/// `POST /internal/token-links` with `{"email": "..."}`. Requires the
/// service key (enforced by middleware). Responds
/// `{"success": true, "tokenizedUrl": "..."}`.
#[instrument(skip(state, body))]
pub async fn issue_token_link(State(state): State<AppState>, body: String) -> Result<Json<Value>> {
    // An unparseable body is treated the same as a missing email.
    let request: TokenLinkRequest = serde_json::from_str(&body).unwrap_or_default();
    let email = request.email.as_deref().unwrap_or("").trim().to_owned();

    if email.is_empty() {
        return Err(AppError::BadRequest("Missing email".to_string()));
    }

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES);

    ResetTokenRepository::new(state.pool())
        .upsert(&email, &token, expires_at)
        .await
        .map_err(AppError::TokenSave)?;

    let config = state.config();
    let tokenized_url =
        build_tokenized_url(&config.app_base_url, &config.set_password_path, &token);

    tracing::info!(
        email = %mask_email(&email),
        url = %safe_url(&tokenized_url),
        %expires_at,
        "Token link issued"
    );

    Ok(Json(json!({
        "success": true,
        "tokenizedUrl": tokenized_url,
    })))
}

/// Concatenate base URL, set-password path, and the encoded token.
fn build_tokenized_url(base_url: &str, path: &str, token: &str) -> String {
    format!(
        "{}{}?token={}",
        base_url.trim_end_matches('/'),
        path,
        urlencoding::encode(token)
    )
}

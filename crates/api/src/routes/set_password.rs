//! Token redemption handler (public).
//!
//! Receives a token and a credential hash computed by the caller; this
//! handler never sees a plaintext password. Redemption is single-use: the
//! token row is consumed in the same transaction that stores the hash.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::{Redemption, ResetTokenRepository};
use crate::error::{AppError, Result};
use crate::redact::mask_email;
use crate::state::AppState;

/// Redemption request body.
#[derive(Debug, Default, Deserialize)]
struct SetPasswordRequest {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "passwordHash")]
    password_hash: Option<String>,
}

/// Redeem a token and store the new password hash.
///
/// `POST /api/set-password` with `{"token": "...", "passwordHash": "..."}`.
/// A token that is unknown, already used, overwritten by a newer request,
/// or expired all answer the same way: 400 "Token is invalid or expired".
#[instrument(skip(state, body))]
pub async fn set_password(State(state): State<AppState>, body: String) -> Result<Json<Value>> {
    let Ok(request) = serde_json::from_str::<SetPasswordRequest>(&body) else {
        return Err(AppError::BadRequest("Invalid request body".to_string()));
    };

    let token = request.token.as_deref().unwrap_or("").trim().to_owned();
    let password_hash = request
        .password_hash
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_owned();

    if token.is_empty() || password_hash.is_empty() {
        return Err(AppError::BadRequest(
            "Missing token or passwordHash".to_string(),
        ));
    }

    let outcome = ResetTokenRepository::new(state.pool())
        .redeem(&token, &password_hash)
        .await
        .map_err(AppError::PasswordUpdate)?;

    match outcome {
        Redemption::Applied { email } => {
            tracing::info!(email = %mask_email(email.as_str()), "Password set via token");
            Ok(Json(json!({ "success": true })))
        }
        Redemption::NotFound => {
            tracing::debug!("Redemption failed: token not found");
            Err(AppError::TokenInvalid)
        }
        Redemption::Expired => {
            tracing::debug!("Redemption failed: token expired, row removed");
            Err(AppError::TokenInvalid)
        }
    }
}

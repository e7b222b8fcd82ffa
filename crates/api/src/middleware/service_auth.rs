//! Service-credential guard for the internal token-link route.
//!
//! Token issuance is not a public capability: only the dispatch handler and
//! the Stripe webhook may mint tokens, and both present the service key as
//! a bearer credential on their internal call.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;
use crate::stripe::signature::constant_time_compare;

/// Require a `Bearer <service key>` authorization header.
pub async fn require_service_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let authorized = presented.is_some_and(|key| {
        constant_time_compare(key, state.config().service_key.expose_secret())
    });

    if !authorized {
        tracing::warn!("token-link call without valid service credentials");
        return Err(AppError::Unauthorized(
            "Missing or invalid service credentials".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

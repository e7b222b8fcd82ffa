//! Route handlers for the API.
//!
//! Three groups, each with its own guard:
//! - browser-facing handlers behind the origin allow-list
//! - the internal token-link route behind the service key
//! - the Stripe webhook, authenticated by its signature header instead

pub mod password_reset;
pub mod set_password;
pub mod stripe;
pub mod token_links;

use axum::{Router, middleware::from_fn_with_state, routing::post};

use crate::error::AppError;
use crate::middleware::{require_allowed_origin, require_service_key};
use crate::state::AppState;

/// Assemble all API routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    let browser = Router::new()
        .route(
            "/api/password-reset",
            post(password_reset::send_reset_email).fallback(method_not_allowed),
        )
        .route(
            "/api/set-password",
            post(set_password::set_password).fallback(method_not_allowed),
        )
        .layer(from_fn_with_state(state.clone(), require_allowed_origin));

    let internal = Router::new()
        .route(
            "/internal/token-links",
            post(token_links::issue_token_link).fallback(method_not_allowed),
        )
        .layer(from_fn_with_state(state.clone(), require_service_key));

    let webhooks = Router::new().route("/api/stripe/webhook", post(stripe::handle_webhook));

    browser.merge(internal).merge(webhooks)
}

/// Shared 405 fallback so wrong-method requests still get structured JSON.
async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

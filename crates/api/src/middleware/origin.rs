//! Origin allow-list guard for browser-facing handlers.
//!
//! The CORS middleware only withholds headers; this guard actively rejects
//! cross-origin calls from unlisted sites with `403`. Requests without an
//! `Origin` header (same-origin or server-to-server) pass through.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Reject requests whose declared origin is not on the allow-list.
pub async fn require_allowed_origin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .is_ok_and(|o| state.config().origin_allowed(o));

        if !allowed {
            tracing::warn!(origin = ?origin, "Origin not allowed");
            return Err(AppError::OriginNotAllowed);
        }
    }

    Ok(next.run(request).await)
}

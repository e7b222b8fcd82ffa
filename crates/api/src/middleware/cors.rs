//! CORS middleware for browser-facing handlers.
//!
//! Reflects the request origin back only when it is on the configured
//! allow-list; unlisted origins get no `Access-Control-Allow-Origin` header
//! and the browser blocks the response. Preflight `OPTIONS` requests are
//! answered here with `204` and never reach the handlers. Requests without
//! an `Origin` header (same-origin or server-to-server) pass through
//! untouched.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Attach CORS headers to every response and short-circuit preflights.
pub async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let cors_headers = build_cors_headers(origin.as_ref(), &state.config().allowed_origins);

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        response.headers_mut().extend(cors_headers);
        return response;
    }

    let mut response = next.run(request).await;
    response.headers_mut().extend(cors_headers);
    response
}

/// Build the CORS header set for a request origin.
fn build_cors_headers(origin: Option<&HeaderValue>, allowed: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, content-type, stripe-signature"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );

    if let Some(origin) = origin {
        let is_allowed = origin
            .to_str()
            .is_ok_and(|o| allowed.iter().any(|a| a == o));
        if is_allowed {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }
    }

    headers
}

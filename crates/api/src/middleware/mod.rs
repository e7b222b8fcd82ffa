//! Middleware for the API handlers.

pub mod cors;
pub mod origin;
pub mod service_auth;

pub use cors::cors;
pub use origin::require_allowed_origin;
pub use service_auth::require_service_key;

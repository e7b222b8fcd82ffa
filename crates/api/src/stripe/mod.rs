//! Stripe webhook plumbing.
//!
//! - [`signature`] - webhook signature verification
//! - [`types`] - the slice of the event payload the handler reads
//! - [`interval`] - billing-interval derivation from line-item text

pub mod interval;
pub mod signature;
pub mod types;

pub use interval::classify_interval;
pub use signature::{SignatureError, WebhookVerifier};
pub use types::Event;

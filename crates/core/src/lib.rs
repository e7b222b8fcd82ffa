//! Owner Report Core - Shared types library.
//!
//! This crate provides common types used across the Owner Report backend:
//! - `api` - Account-activation/password-reset handlers and the Stripe webhook
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Validated email addresses and billing intervals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! Paystack gateway adapter.
//!
//! Implements the `PaystackGateway` port against the Paystack REST API,
//! including:
//! - Checkout initialization and charge lookup
//! - Plan and subscription management
//! - Refund creation
//!
//! # Security
//!
//! - The account secret key travels as a bearer token over TLS only
//! - Secrets are handled via `secrecy::SecretString`
//! - Webhook signature verification lives with the event types in
//!   `domain::webhook`, not here: it must run before any decoding

mod client;
mod mock;

pub use client::{PaystackApiConfig, PaystackClient};
pub use mock::MockPaystackGateway;

//! Webhook domain module.
//!
//! Signature verification and event decoding for inbound Paystack webhooks.
//!
//! # Module Structure
//!
//! - `errors` - Webhook error taxonomy with HTTP status mapping
//! - `event` - Event envelope and payload accessors
//! - `signature` - HMAC-SHA512 signature verification

mod errors;
mod event;
mod signature;

pub use errors::WebhookError;
pub use event::WebhookEvent;
pub use signature::{PaystackWebhookVerifier, MAX_PAYLOAD_BYTES};

#[cfg(test)]
pub use signature::sign_test_payload;

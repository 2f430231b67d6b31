//! Webhook error types for Paystack webhook handling.
//!
//! Covers everything that can go wrong before an event reaches a handler:
//! size limits, signature verification, and payload parsing. Handler-side
//! failures travel as `DomainError` instead.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur while verifying and decoding an inbound webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Request body was empty.
    #[error("Empty payload")]
    EmptyPayload,

    /// Request body exceeded the size cap.
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// No signature header was sent.
    #[error("Missing signature header")]
    MissingSignature,

    /// No webhook secret is configured, so nothing can be verified.
    #[error("Webhook secret not configured")]
    SecretUnconfigured,

    /// Signature header did not match the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Failed to parse the webhook payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Payload parsed but carried no event name.
    #[error("Missing event name")]
    MissingEventName,
}

impl WebhookError {
    /// Maps the error to the HTTP status the gateway sees.
    ///
    /// The gateway retries non-2xx deliveries, so these codes double as
    /// retry hints: a signature failure will never succeed on retry, but it
    /// is reported as `401` rather than swallowed so misconfiguration shows
    /// up in delivery logs.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Malformed requests
            WebhookError::EmptyPayload
            | WebhookError::PayloadTooLarge(_)
            | WebhookError::ParseError(_)
            | WebhookError::MissingEventName => StatusCode::BAD_REQUEST,

            // Authentication failures
            WebhookError::MissingSignature
            | WebhookError::SecretUnconfigured
            | WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
        }
    }
}

//! Axum router configuration for the Paystack endpoints.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::domain::webhook::MAX_PAYLOAD_BYTES;

use super::handlers::{confirm_payment, receive_webhook, PaystackAppState};

/// Create the Paystack integration router.
///
/// # Routes
///
/// - `POST /webhooks/paystack` - signed gateway webhook intake
/// - `POST /payments/paystack/confirm` - browser-redirect confirmation
pub fn paystack_router() -> Router<PaystackAppState> {
    Router::new()
        .route("/webhooks/paystack", post(receive_webhook))
        .route("/payments/paystack/confirm", post(confirm_payment))
        // The verifier owns the 1 MiB policy cap and turns violations into
        // 400s; the transport limit above it just bounds how much of an
        // abusive body gets buffered.
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES * 2))
        .layer(TraceLayer::new_for_http())
}

//! HTTP handlers for the Paystack endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use crate::application::{ConfirmPaymentRequest, ConfirmationService, WebhookDispatcher};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::webhook::PaystackWebhookVerifier;

use super::dto::{
    ConfirmRequestBody, ConfirmSuccessResponse, FailureResponse, OrderRef, WebhookAck,
};

/// Header Paystack signs each delivery into.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Shared state for the Paystack routes.
#[derive(Clone)]
pub struct PaystackAppState {
    pub verifier: Arc<PaystackWebhookVerifier>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub confirmation: Arc<ConfirmationService>,
}

/// Receives a signed gateway webhook.
///
/// POST /webhooks/paystack
///
/// The raw body is verified against the signature header before any JSON
/// decoding. Verification failures answer 400/401, an unresolvable order
/// answers 404, and both handled and intentionally unhandled events answer
/// 200 so the gateway stops redelivering them.
pub async fn receive_webhook(
    State(state): State<PaystackAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let event = match state.verifier.verify_and_parse(&body, signature) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "Webhook rejected before dispatch");
            return (
                err.status_code(),
                Json(FailureResponse {
                    status: "failed",
                    message: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.dispatcher.dispatch(&event).await {
        Ok(outcome) => {
            info!(event = %event.event, outcome = ?outcome, "Webhook dispatched");
            (
                StatusCode::OK,
                Json(WebhookAck {
                    message: outcome.message(),
                }),
            )
                .into_response()
        }
        Err(err) => {
            warn!(event = %event.event, error = %err, "Webhook dispatch failed");
            failure(&err)
        }
    }
}

/// Confirms a payment after the gateway redirects the shopper back.
///
/// POST /payments/paystack/confirm
pub async fn confirm_payment(
    State(state): State<PaystackAppState>,
    Json(body): Json<ConfirmRequestBody>,
) -> Response {
    let request = ConfirmPaymentRequest {
        nonce: body.nonce,
        transaction_id: body.transaction_id,
    };

    match state.confirmation.confirm_payment(request).await {
        Ok(confirmation) => (
            StatusCode::OK,
            Json(ConfirmSuccessResponse {
                status: "success",
                message: confirmation.message,
                redirect_url: confirmation.redirect_url,
                order: OrderRef {
                    uuid: confirmation.order_id.to_string(),
                },
            }),
        )
            .into_response(),
        Err(err) => failure(&err),
    }
}

fn failure(err: &DomainError) -> Response {
    (
        error_status(err),
        Json(FailureResponse {
            status: "failed",
            message: err.message.clone(),
        }),
    )
        .into_response()
}

/// HTTP status for a reconciliation error.
fn error_status(err: &DomainError) -> StatusCode {
    if err.code.is_not_found() {
        return StatusCode::NOT_FOUND;
    }
    match err.code {
        ErrorCode::ValidationFailed
        | ErrorCode::EmptyField
        | ErrorCode::InvalidFormat
        | ErrorCode::InvalidNonce
        | ErrorCode::UnsupportedCurrency
        | ErrorCode::MissingEmailToken => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes_answer_404() {
        let err = DomainError::new(ErrorCode::OrderNotFound, "Order not found");
        assert_eq!(error_status(&err), StatusCode::NOT_FOUND);

        let err = DomainError::new(ErrorCode::TransactionNotFound, "Transaction not found");
        assert_eq!(error_status(&err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn request_errors_answer_400() {
        let err = DomainError::new(ErrorCode::InvalidNonce, "Invalid nonce");
        assert_eq!(error_status(&err), StatusCode::BAD_REQUEST);

        let err = DomainError::new(ErrorCode::ValidationFailed, "Missing field");
        assert_eq!(error_status(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gateway_errors_answer_500() {
        let err = DomainError::new(ErrorCode::GatewayError, "Upstream timeout");
        assert_eq!(error_status(&err), StatusCode::INTERNAL_SERVER_ERROR);

        let err = DomainError::new(ErrorCode::RefundFailed, "Refund rejected");
        assert_eq!(error_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! Wire DTOs for the Paystack endpoints.

use serde::{Deserialize, Serialize};

/// Body of the confirmation call made from the redirect landing page.
///
/// Both fields are optional at the wire level; the confirmation service
/// produces the user-facing validation messages for whatever is missing.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequestBody {
    #[serde(default)]
    pub nonce: Option<String>,

    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Success envelope of the confirmation endpoint.
#[derive(Debug, Serialize)]
pub struct ConfirmSuccessResponse {
    pub status: &'static str,
    pub message: String,
    pub redirect_url: String,
    pub order: OrderRef,
}

/// Order reference returned to the redirect page.
#[derive(Debug, Serialize)]
pub struct OrderRef {
    pub uuid: String,
}

/// Failure envelope shared by both endpoints.
#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub status: &'static str,
    pub message: String,
}

/// Acknowledgement body for webhook deliveries, handled or not.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub message: &'static str,
}

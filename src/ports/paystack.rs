//! Paystack gateway port.
//!
//! Defines the contract for the remote Paystack REST API: transaction
//! initialization and lookup, plan and subscription management, and refunds.
//! Implementations own HTTP, auth, and envelope decoding; callers see typed
//! payloads or a `GatewayError`.
//!
//! # Design
//!
//! - **Envelope-aware**: the gateway wraps every response in
//!   `{status, message, data}`; implementations unwrap it and surface
//!   `status: false` as `GatewayError::api` so callers only branch on `Result`
//! - **JSON-shaped payloads**: nested objects we merely pass through
//!   (authorization, customer, plan) stay as raw `serde_json::Value`
//! - **No retries**: retry policy belongs to callers who know whether an
//!   operation is idempotent

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::orders::BillingSnapshot;
use crate::domain::subscriptions::{SubscriptionStatus, SubscriptionUpdate};

/// Port for the remote Paystack API.
#[async_trait]
pub trait PaystackGateway: Send + Sync {
    /// Create a checkout session for a charge (`POST transaction/initialize`).
    async fn initialize_transaction(
        &self,
        request: InitializeTransactionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Fetch a charge by its gateway id (`GET transaction/{id}`).
    async fn fetch_transaction(&self, charge_id: &str) -> Result<ChargePayload, GatewayError>;

    /// List charges, one page at a time (`GET transaction`).
    async fn list_transactions(
        &self,
        query: TransactionListQuery,
    ) -> Result<TransactionPage, GatewayError>;

    /// Fetch a plan by its code (`GET plan/{code}`).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::api` when the plan no longer exists; callers
    /// treat that as a cache miss and create a fresh plan.
    async fn fetch_plan(&self, plan_code: &str) -> Result<PlanPayload, GatewayError>;

    /// Create a plan (`POST plan`).
    async fn create_plan(&self, request: CreatePlanRequest) -> Result<PlanPayload, GatewayError>;

    /// Create a subscription against a plan (`POST subscription`).
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionPayload, GatewayError>;

    /// Fetch a subscription by its code (`GET subscription/{code}`).
    async fn fetch_subscription(
        &self,
        subscription_code: &str,
    ) -> Result<SubscriptionPayload, GatewayError>;

    /// Disable a subscription (`POST subscription/disable`).
    ///
    /// The gateway has no DELETE for subscriptions; disabling requires the
    /// subscription code plus the email token issued at creation.
    async fn disable_subscription(
        &self,
        subscription_code: &str,
        email_token: &str,
    ) -> Result<(), GatewayError>;

    /// Create a refund against a charge (`POST refund`).
    async fn create_refund(&self, request: CreateRefundRequest)
        -> Result<RefundPayload, GatewayError>;
}

/// Request to initialize a checkout transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeTransactionRequest {
    /// Customer email; the gateway keys customers by it.
    pub email: String,

    /// Amount in minor units.
    pub amount: i64,

    /// ISO currency code.
    pub currency: String,

    /// Merchant reference, `<transaction-id>_<unix-ts>`.
    pub reference: String,

    /// Where the gateway redirects the customer after payment.
    pub callback_url: String,

    /// Free-form metadata echoed back on webhooks; carries the order,
    /// transaction, and subscription hashes reconciliation keys on.
    pub metadata: Value,
}

/// Checkout session returned by transaction initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Hosted payment page to redirect the customer to.
    pub authorization_url: String,

    /// Access code for inline checkout embeds.
    pub access_code: String,

    /// The reference echoed back, as registered with the gateway.
    pub reference: String,
}

/// One page of a charge listing.
#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub transactions: Vec<ChargePayload>,

    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Query for listing charges.
#[derive(Debug, Clone, Default)]
pub struct TransactionListQuery {
    /// Gateway customer code to filter by.
    pub customer: String,

    /// Page cursor from a previous `TransactionPage`.
    pub cursor: Option<String>,
}

/// A charge as the gateway reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargePayload {
    /// Numeric gateway charge id.
    pub id: i64,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub reference: String,

    pub amount: i64,

    #[serde(default)]
    pub currency: String,

    #[serde(default)]
    pub paid_at: Option<String>,

    /// Checkout metadata echoed back by the gateway.
    #[serde(default)]
    pub metadata: Value,

    /// Raw authorization object; stored verbatim on renewal rows.
    #[serde(default)]
    pub authorization: Value,

    #[serde(default)]
    pub customer: Value,
}

impl ChargePayload {
    /// Gateway charge id in the string form stored locally.
    pub fn vendor_charge_id(&self) -> String {
        self.id.to_string()
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn authorization_code(&self) -> Option<&str> {
        self.authorization
            .get("authorization_code")
            .and_then(Value::as_str)
    }

    pub fn customer_code(&self) -> Option<&str> {
        self.customer.get("customer_code").and_then(Value::as_str)
    }

    pub fn billing_snapshot(&self) -> BillingSnapshot {
        BillingSnapshot::from_authorization(&self.authorization)
    }

    pub fn paid_at_timestamp(&self) -> Option<Timestamp> {
        self.paid_at.as_deref().and_then(Timestamp::parse_gateway)
    }
}

/// Request to create a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanRequest {
    /// Plan display name.
    pub name: String,

    /// Plan description; reconciliation stores the terms fingerprint here.
    pub description: String,

    /// Recurring amount in minor units.
    pub amount: i64,

    /// Gateway interval label (`monthly`, `biannually`, ...).
    pub interval: String,

    pub send_invoices: bool,

    pub send_sms: bool,

    /// Cap on billings; `None` renews until disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_limit: Option<u32>,
}

/// A plan as the gateway reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPayload {
    pub plan_code: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub amount: Option<i64>,

    #[serde(default)]
    pub interval: Option<String>,

    #[serde(default)]
    pub currency: Option<String>,
}

/// Request to create a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Gateway customer code, or the customer email as a fallback.
    pub customer: String,

    /// Plan code to bill against.
    pub plan: String,

    /// Authorization code of the card to charge; the gateway picks the
    /// most recent reusable authorization when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,

    /// ISO-8601 first billing date; used to honor trial periods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

/// A subscription as the gateway reports it.
///
/// Doubles as the decode target for `subscription.*` webhook payloads,
/// which carry the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPayload {
    pub subscription_code: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub email_token: Option<String>,

    #[serde(default)]
    pub amount: Option<i64>,

    #[serde(default)]
    pub next_payment_date: Option<String>,

    #[serde(default, rename = "canceledAt")]
    pub canceled_at: Option<String>,

    #[serde(default)]
    pub customer: Value,

    #[serde(default)]
    pub authorization: Value,

    #[serde(default)]
    pub plan: Value,
}

impl SubscriptionPayload {
    pub fn customer_code(&self) -> Option<&str> {
        self.customer.get("customer_code").and_then(Value::as_str)
    }

    pub fn authorization_code(&self) -> Option<&str> {
        self.authorization
            .get("authorization_code")
            .and_then(Value::as_str)
    }

    pub fn plan_code(&self) -> Option<&str> {
        self.plan.get("plan_code").and_then(Value::as_str)
    }

    /// Distills this remote state into the fields persisted locally.
    ///
    /// When the mapped status is a cancellation, `canceled_at` falls back to
    /// now: the gateway omits the cancellation time on some events.
    pub fn update_payload(&self) -> SubscriptionUpdate {
        let status = SubscriptionStatus::from_vendor(&self.status);
        let canceled_at = if status == SubscriptionStatus::Canceled {
            Some(
                self.canceled_at
                    .as_deref()
                    .and_then(Timestamp::parse_gateway)
                    .unwrap_or_else(Timestamp::now),
            )
        } else {
            None
        };

        SubscriptionUpdate {
            status,
            vendor_subscription_id: (!self.subscription_code.is_empty())
                .then(|| self.subscription_code.clone()),
            vendor_customer_id: self.customer_code().map(str::to_string),
            vendor_plan_id: self.plan_code().map(str::to_string),
            next_billing_date: self
                .next_payment_date
                .as_deref()
                .and_then(Timestamp::parse_gateway),
            canceled_at,
        }
    }
}

/// Request to create a refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRefundRequest {
    /// Gateway charge id to refund against.
    pub transaction: String,

    /// Amount in minor units; `None` refunds the full charge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Note shown to the merchant in the gateway dashboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_note: Option<String>,
}

/// A refund as the gateway reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundPayload {
    /// Numeric gateway refund id.
    pub id: i64,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub amount: Option<i64>,

    #[serde(default)]
    pub currency: Option<String>,
}

impl RefundPayload {
    pub fn vendor_refund_id(&self) -> String {
        self.id.to_string()
    }

    /// Whether the gateway accepted the refund for processing.
    ///
    /// Refunds settle asynchronously; anything outside these states means
    /// the request was rejected.
    pub fn is_accepted(&self) -> bool {
        matches!(self.status.as_str(), "pending" | "processing" | "processed")
    }
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message; for API errors, the gateway's own `message`.
    pub message: String,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Transport-level failure: DNS, TLS, timeout.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// The gateway rejected our credentials.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    /// The gateway answered with an error status or `status: false`.
    pub fn api(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ApiError, message)
    }

    /// The response did not decode into the expected shape.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        DomainError::new(ErrorCode::GatewayError, err.message)
            .with_detail("gateway_code", err.code.to_string())
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// The gateway reported the operation failed.
    ApiError,

    /// Response body could not be decoded.
    InvalidResponse,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::NetworkError)
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::ApiError => "api_error",
            GatewayErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

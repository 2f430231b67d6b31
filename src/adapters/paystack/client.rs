//! Paystack REST API client.
//!
//! Implements the `PaystackGateway` port over HTTPS. Every call authenticates
//! with the account secret key as a bearer token, speaks JSON both ways, and
//! unwraps the `{status, message, data}` envelope the gateway puts around all
//! responses.
//!
//! # Design
//!
//! - Requests time out after 30 seconds; no retries, callers decide
//! - Error responses decode the envelope anyway so the gateway's own
//!   `message` reaches the caller instead of a bare status line
//! - List pagination reads the `meta.next` cursor and hands it back to the
//!   caller as an opaque token

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ports::{
    ChargePayload, CheckoutSession, CreatePlanRequest, CreateRefundRequest,
    CreateSubscriptionRequest, GatewayError, InitializeTransactionRequest, PaystackGateway,
    PlanPayload, RefundPayload, SubscriptionPayload, TransactionListQuery, TransactionPage,
};

/// Hard deadline for any single gateway call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback when an error response carries no decodable message.
const UNKNOWN_API_ERROR: &str = "Unknown Paystack API error";

/// Paystack API configuration.
#[derive(Clone)]
pub struct PaystackApiConfig {
    /// Account secret key (sk_live_... or sk_test_...).
    secret_key: SecretString,

    /// Base URL for the Paystack API (default: https://api.paystack.co).
    api_base_url: String,
}

impl PaystackApiConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            api_base_url: "https://api.paystack.co".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// HTTP implementation of the `PaystackGateway` port.
pub struct PaystackClient {
    config: PaystackApiConfig,
    http_client: reqwest::Client,
}

impl PaystackClient {
    pub fn new(config: PaystackApiConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path
        )
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Envelope, GatewayError> {
        let response = self
            .http_client
            .get(self.endpoint(path))
            .query(query)
            .bearer_auth(self.config.secret_key.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        Self::read_envelope(response).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Envelope, GatewayError> {
        let response = self
            .http_client
            .post(self.endpoint(path))
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        Self::read_envelope(response).await
    }

    async fn read_envelope(response: reqwest::Response) -> Result<Envelope, GatewayError> {
        let http_status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        interpret_response(http_status, &body)
    }
}

/// Maps an HTTP status and raw body to an unwrapped envelope.
///
/// The gateway reports operation failures two ways: an HTTP error status, or
/// a `200` whose envelope carries `status: false`. Both collapse into
/// `GatewayError` here so callers branch on `Result` alone.
fn interpret_response(http_status: StatusCode, body: &[u8]) -> Result<Envelope, GatewayError> {
    let envelope: Option<Envelope> = serde_json::from_slice(body).ok();

    if http_status.is_client_error() || http_status.is_server_error() {
        let message = envelope
            .and_then(|e| e.message)
            .unwrap_or_else(|| UNKNOWN_API_ERROR.to_string());

        tracing::warn!(
            status = http_status.as_u16(),
            error = %message,
            "Paystack API call failed"
        );

        let error = match http_status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                GatewayError::authentication(message)
            }
            _ => GatewayError::api(message),
        };
        return Err(error);
    }

    let envelope = envelope
        .ok_or_else(|| GatewayError::invalid_response("Response body was not valid JSON"))?;

    if !envelope.status {
        return Err(GatewayError::api(
            envelope
                .message
                .unwrap_or_else(|| UNKNOWN_API_ERROR.to_string()),
        ));
    }

    Ok(envelope)
}

/// The `{status, message, data}` wrapper around every gateway response.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: bool,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    data: Value,

    /// Pagination info; only list endpoints populate it.
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next: Option<String>,
}

impl Envelope {
    fn decode_data<T: DeserializeOwned>(self) -> Result<T, GatewayError> {
        serde_json::from_value(self.data).map_err(|e| {
            GatewayError::invalid_response(format!("Unexpected response shape: {}", e))
        })
    }
}

#[async_trait]
impl PaystackGateway for PaystackClient {
    async fn initialize_transaction(
        &self,
        request: InitializeTransactionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.post("transaction/initialize", &request)
            .await?
            .decode_data()
    }

    async fn fetch_transaction(&self, charge_id: &str) -> Result<ChargePayload, GatewayError> {
        self.get(&format!("transaction/{}", charge_id), &[])
            .await?
            .decode_data()
    }

    async fn list_transactions(
        &self,
        query: TransactionListQuery,
    ) -> Result<TransactionPage, GatewayError> {
        let mut params = vec![("customer", query.customer)];
        if let Some(cursor) = query.cursor {
            params.push(("next", cursor));
        }

        let envelope = self.get("transaction", &params).await?;
        let next_cursor = envelope.meta.as_ref().and_then(|m| m.next.clone());
        let transactions: Vec<ChargePayload> = envelope.decode_data()?;

        Ok(TransactionPage {
            transactions,
            next_cursor,
        })
    }

    async fn fetch_plan(&self, plan_code: &str) -> Result<PlanPayload, GatewayError> {
        self.get(&format!("plan/{}", plan_code), &[])
            .await?
            .decode_data()
    }

    async fn create_plan(&self, request: CreatePlanRequest) -> Result<PlanPayload, GatewayError> {
        self.post("plan", &request).await?.decode_data()
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionPayload, GatewayError> {
        self.post("subscription", &request).await?.decode_data()
    }

    async fn fetch_subscription(
        &self,
        subscription_code: &str,
    ) -> Result<SubscriptionPayload, GatewayError> {
        self.get(&format!("subscription/{}", subscription_code), &[])
            .await?
            .decode_data()
    }

    async fn disable_subscription(
        &self,
        subscription_code: &str,
        email_token: &str,
    ) -> Result<(), GatewayError> {
        // No DELETE endpoint exists; disable is a POST with the email token
        // issued when the subscription was created.
        let body = json!({
            "code": subscription_code,
            "token": email_token,
        });

        self.post("subscription/disable", &body).await?;
        Ok(())
    }

    async fn create_refund(
        &self,
        request: CreateRefundRequest,
    ) -> Result<RefundPayload, GatewayError> {
        self.post("refund", &request).await?.decode_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayErrorCode;

    // ════════════════════════════════════════════════════════════════════════════
    // Envelope Interpretation Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn success_envelope_unwraps() {
        let body = br#"{"status":true,"message":"Verification successful","data":{"id":42}}"#;
        let envelope = interpret_response(StatusCode::OK, body).unwrap();
        assert_eq!(envelope.data["id"], 42);
    }

    #[test]
    fn error_status_surfaces_gateway_message() {
        let body = br#"{"status":false,"message":"Invalid plan code"}"#;
        let err = interpret_response(StatusCode::BAD_REQUEST, body).unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::ApiError);
        assert_eq!(err.message, "Invalid plan code");
    }

    #[test]
    fn error_status_without_body_uses_fallback_message() {
        let err = interpret_response(StatusCode::INTERNAL_SERVER_ERROR, b"").unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::ApiError);
        assert_eq!(err.message, UNKNOWN_API_ERROR);
    }

    #[test]
    fn unauthorized_maps_to_authentication_error() {
        let body = br#"{"status":false,"message":"Invalid key"}"#;
        let err = interpret_response(StatusCode::UNAUTHORIZED, body).unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::AuthenticationError);
        assert_eq!(err.message, "Invalid key");
    }

    #[test]
    fn ok_with_status_false_is_an_api_error() {
        // The gateway occasionally reports failures inside a 200
        let body = br#"{"status":false,"message":"Transaction not found"}"#;
        let err = interpret_response(StatusCode::OK, body).unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::ApiError);
        assert_eq!(err.message, "Transaction not found");
    }

    #[test]
    fn non_json_success_body_is_invalid_response() {
        let err = interpret_response(StatusCode::OK, b"<html>gateway timeout</html>").unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidResponse);
    }

    #[test]
    fn pagination_cursor_is_read_from_meta() {
        let body = br#"{"status":true,"message":"ok","data":[],"meta":{"next":"cursor_abc"}}"#;
        let envelope = interpret_response(StatusCode::OK, body).unwrap();
        assert_eq!(
            envelope.meta.and_then(|m| m.next).as_deref(),
            Some("cursor_abc")
        );
    }

    #[test]
    fn missing_meta_means_no_cursor() {
        let body = br#"{"status":true,"message":"ok","data":[]}"#;
        let envelope = interpret_response(StatusCode::OK, body).unwrap();
        assert!(envelope.meta.is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Endpoint Construction Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn endpoint_joins_without_duplicate_slash() {
        let client = PaystackClient::new(
            PaystackApiConfig::new("sk_test_x").with_base_url("http://localhost:8081/"),
        );
        assert_eq!(
            client.endpoint("transaction/initialize"),
            "http://localhost:8081/transaction/initialize"
        );
    }

    #[test]
    fn endpoint_defaults_to_production_base() {
        let client = PaystackClient::new(PaystackApiConfig::new("sk_test_x"));
        assert_eq!(client.endpoint("refund"), "https://api.paystack.co/refund");
    }

    #[test]
    fn decode_data_reports_shape_mismatch() {
        let body = br#"{"status":true,"message":"ok","data":{"unexpected":"shape"}}"#;
        let envelope = interpret_response(StatusCode::OK, body).unwrap();
        let result: Result<CheckoutSession, _> = envelope.decode_data();

        let err = result.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidResponse);
    }
}

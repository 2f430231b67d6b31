//! Inbound webhook event envelope.
//!
//! Paystack delivers `{"event": "<name>", "data": {...}}` with a data shape
//! that varies per event. The envelope keeps `data` as raw JSON and exposes
//! the handful of fields reconciliation actually reads through accessors, so
//! each handler stays tolerant of fields the gateway adds over time.

use serde::Deserialize;
use serde_json::Value;

use super::WebhookError;

/// A decoded webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Raw event name as sent by the gateway, e.g. `charge.success`.
    pub event: String,

    /// Event-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl WebhookEvent {
    /// Parses a verified payload into an event envelope.
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        let event: WebhookEvent =
            serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        if event.event.trim().is_empty() {
            return Err(WebhookError::MissingEventName);
        }
        Ok(event)
    }

    /// Event name with dots flattened to underscores, the registry key form.
    pub fn normalized_name(&self) -> String {
        self.event.replace('.', "_")
    }

    /// String field at a JSON pointer inside `data`.
    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.data.pointer(pointer).and_then(Value::as_str)
    }

    /// Integer field at a JSON pointer inside `data`.
    pub fn i64_at(&self, pointer: &str) -> Option<i64> {
        self.data.pointer(pointer).and_then(Value::as_i64)
    }

    /// Identifier at a JSON pointer, accepting both string and numeric ids.
    ///
    /// The gateway sends charge ids as numbers and most other ids as
    /// strings; locally everything is stored as a string.
    pub fn id_at(&self, pointer: &str) -> Option<String> {
        match self.data.pointer(pointer)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Checkout metadata echoed back by the gateway, when present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.data
            .pointer("/metadata")?
            .get(key)
            .and_then(Value::as_str)
    }

    pub fn order_hash(&self) -> Option<&str> {
        self.metadata_str("order_hash")
    }

    pub fn transaction_hash(&self) -> Option<&str> {
        self.metadata_str("transaction_hash")
    }

    pub fn subscription_hash(&self) -> Option<&str> {
        self.metadata_str("subscription_hash")
    }

    pub fn transaction_reference(&self) -> Option<&str> {
        self.str_at("/transaction_reference")
    }

    /// Subscription code, at the top level or nested under `subscription`.
    ///
    /// Lifecycle events (`subscription.create`, `subscription.not_renew`)
    /// carry it at the top level; invoice events nest it.
    pub fn subscription_code(&self) -> Option<&str> {
        self.str_at("/subscription_code")
            .or_else(|| self.str_at("/subscription/subscription_code"))
    }

    pub fn email_token(&self) -> Option<&str> {
        self.str_at("/email_token")
    }

    /// Authorization snapshot attached to charge and subscription events.
    pub fn authorization(&self) -> Option<&Value> {
        self.data.pointer("/authorization")
    }

    pub fn amount(&self) -> Option<i64> {
        self.i64_at("/amount")
    }

    pub fn currency(&self) -> Option<&str> {
        self.str_at("/currency")
    }
}

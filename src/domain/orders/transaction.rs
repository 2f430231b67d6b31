//! Order transaction entity.
//!
//! A transaction is one money movement against an order: the initial charge,
//! a renewal charge, or a refund. Charges are created as `Pending` rows at
//! checkout and later settled from gateway data; refunds are created already
//! `Refunded` since the gateway only reports them after the fact.
//!
//! ## Design Decisions
//!
//! - **`Succeeded` is terminal for charges.** Settlement is a one-way gate:
//!   once a charge is succeeded, replays of the same gateway event must not
//!   touch it again. The compare-and-set lives in the repository; this entity
//!   only exposes the settled write.
//! - **Meta is a free-form JSON bag.** The gateway's authorization snapshot,
//!   refund descriptions, and provenance markers all land here; typed fields
//!   are reserved for values the reconciliation logic branches on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{OrderId, SubscriptionId, Timestamp, TransactionId};

/// Payment method identifier recorded on every row this core writes.
pub const PAYMENT_METHOD: &str = "paystack";

/// Meta key carrying the gateway refund id on locally-created refund rows.
pub const REFUND_ID_META_KEY: &str = "paystack_refund_id";

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Refunded,
    Failed,
}

/// Direction of the money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Charge,
    Refund,
}

/// Card details captured from a successful charge's authorization.
///
/// Stored both as typed columns on the transaction and, in full, inside meta
/// so subscriptions can display the active payment method. Field names match
/// the gateway's authorization object so stored snapshots stay diffable
/// against raw webhook payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingSnapshot {
    /// Payment channel reported by the gateway, `card` when absent.
    pub payment_type: String,
    pub last4: Option<String>,
    pub brand: Option<String>,
    /// Reusable authorization code for charging this card again.
    pub authorization_code: Option<String>,
    pub channel: Option<String>,
    pub exp_month: Option<String>,
    pub exp_year: Option<String>,
}

impl BillingSnapshot {
    /// Builds a snapshot from a gateway `authorization` object.
    ///
    /// Tolerant of missing fields: webhook payloads for non-card channels
    /// omit most of them.
    pub fn from_authorization(authorization: &Value) -> Self {
        let field = |key: &str| {
            authorization
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            payment_type: field("channel").unwrap_or_else(|| "card".to_string()),
            last4: field("last4"),
            brand: field("brand"),
            authorization_code: field("authorization_code"),
            channel: field("channel"),
            exp_month: field("exp_month"),
            exp_year: field("exp_year"),
        }
    }

    pub fn to_meta_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A single charge or refund against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTransaction {
    /// Local identifier; round-tripped as `metadata.transaction_hash` and as
    /// the prefix of the gateway reference.
    pub id: TransactionId,

    pub order_id: OrderId,

    /// Subscription this row belongs to, for signup and renewal charges.
    pub subscription_id: Option<SubscriptionId>,

    pub transaction_type: TransactionType,

    pub status: TransactionStatus,

    /// Gateway identifier, e.g. `paystack`. Lookups always pair the local id
    /// with this so another gateway's rows are never touched.
    pub payment_method: String,

    /// Charge channel from the authorization snapshot (`card`, `bank`, ...).
    pub payment_method_type: Option<String>,

    pub card_last_4: Option<String>,

    pub card_brand: Option<String>,

    /// Gateway-side charge or refund id. `None` on unsettled placeholders.
    pub vendor_charge_id: Option<String>,

    /// ISO currency code, uppercase.
    pub currency: String,

    /// Amount in minor units.
    pub total: i64,

    /// Sum of refund rows recorded against this charge, minor units.
    pub refunded_total: i64,

    /// Free-form bag: authorization snapshots, refund provenance, flags.
    pub meta: Map<String, Value>,

    /// For refund rows, the charge being refunded.
    pub parent_id: Option<TransactionId>,

    pub created_at: Timestamp,
}

impl OrderTransaction {
    /// Creates the pending charge row checkout hands to the gateway.
    pub fn new_charge(order_id: OrderId, total: i64, currency: impl Into<String>) -> Self {
        Self {
            id: TransactionId::new(),
            order_id,
            subscription_id: None,
            transaction_type: TransactionType::Charge,
            status: TransactionStatus::Pending,
            payment_method: PAYMENT_METHOD.to_string(),
            payment_method_type: None,
            card_last_4: None,
            card_brand: None,
            vendor_charge_id: None,
            currency: currency.into(),
            total,
            refunded_total: 0,
            meta: Map::new(),
            parent_id: None,
            created_at: Timestamp::now(),
        }
    }

    /// Creates a refund row against `parent_id`, already in `Refunded` state.
    pub fn new_refund(
        order_id: OrderId,
        parent_id: TransactionId,
        total: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            order_id,
            subscription_id: None,
            transaction_type: TransactionType::Refund,
            status: TransactionStatus::Refunded,
            payment_method: PAYMENT_METHOD.to_string(),
            payment_method_type: None,
            card_last_4: None,
            card_brand: None,
            vendor_charge_id: None,
            currency: currency.into(),
            total,
            refunded_total: 0,
            meta: Map::new(),
            parent_id: Some(parent_id),
            created_at: Timestamp::now(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == TransactionStatus::Succeeded
    }

    /// A charge row the gateway has not been matched to yet: no vendor id
    /// and still pending. Renewal backfill claims these oldest-first.
    pub fn is_placeholder(&self) -> bool {
        self.transaction_type == TransactionType::Charge
            && self.status == TransactionStatus::Pending
            && self.vendor_charge_id.is_none()
    }

    /// Gateway reference for this transaction, unique per initiation attempt.
    pub fn reference_at(&self, issued_at: Timestamp) -> String {
        format!("{}_{}", self.id, issued_at.as_unix_secs())
    }

    /// Recovers the local transaction id from a gateway reference.
    ///
    /// References are `<id>_<unix-seconds>`; anything before the first
    /// underscore must parse as the id, or the reference is foreign.
    pub fn id_from_reference(reference: &str) -> Option<TransactionId> {
        let prefix = reference.split('_').next()?;
        prefix.parse().ok()
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: Value) {
        self.meta.insert(key.into(), value);
    }

    /// Merges `patch` into this transaction's meta, patch entries winning.
    pub fn merge_meta(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.meta.insert(key.clone(), value.clone());
        }
    }
}

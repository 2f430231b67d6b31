//! Subscription aggregate entity.
//!
//! A subscription belongs to exactly one parent order and mirrors a gateway
//! subscription once activated. Remote state flows in through
//! [`SubscriptionUpdate`] payloads built from gateway responses; local code
//! never invents status transitions on its own.
//!
//! ## Design Decisions
//!
//! - **Terminal states stay terminal.** Once a subscription is canceled,
//!   completed, or expired, webhook replays and resyncs must not resurrect
//!   it. Callers check [`SubscriptionStatus::is_terminal`] before applying
//!   remote state; `apply_update` itself stays mechanical.
//! - **Gateway secrets ride in meta.** The email token needed to disable a
//!   remote subscription and the active payment-method snapshot are
//!   free-form gateway artifacts, so they live in the meta bag under the
//!   keys below rather than as typed columns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{OrderId, SubscriptionId, Timestamp};
use crate::domain::orders::BillingSnapshot;

use super::BillingInterval;

/// Meta key holding the gateway email token used for remote cancellation.
pub const EMAIL_TOKEN_META_KEY: &str = "paystack_email_token";

/// Meta key holding the billing snapshot of the card currently charged.
pub const ACTIVE_PAYMENT_METHOD_META_KEY: &str = "active_payment_method";

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    Paused,
    Canceled,
    Expired,
    Completed,
    Failing,
}

impl SubscriptionStatus {
    /// Maps a gateway status label to the local status.
    ///
    /// Unrecognized labels map to `Active`: the gateway only reports
    /// subscriptions it is still willing to bill, so unknown is treated as
    /// billable rather than dead.
    pub fn from_vendor(status: &str) -> Self {
        match status {
            "active" => SubscriptionStatus::Active,
            "inactive" => SubscriptionStatus::Expired,
            "non-renewing" | "cancelled" => SubscriptionStatus::Canceled,
            "paused" => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::Active,
        }
    }

    /// Terminal states are never overwritten by remote data.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Canceled
                | SubscriptionStatus::Expired
                | SubscriptionStatus::Completed
        )
    }

    /// States in which the subscription is considered in good standing.
    pub fn is_running(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Completed => "completed",
            SubscriptionStatus::Failing => "failing",
        }
    }
}

/// Remote state distilled into the fields we are willing to persist.
///
/// Built by the application layer from gateway responses; `None` fields
/// leave the current value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub status: SubscriptionStatus,
    pub vendor_subscription_id: Option<String>,
    pub vendor_customer_id: Option<String>,
    pub vendor_plan_id: Option<String>,
    pub next_billing_date: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
}

impl SubscriptionUpdate {
    /// An update that only moves the status.
    pub fn status_only(status: SubscriptionStatus) -> Self {
        Self {
            status,
            vendor_subscription_id: None,
            vendor_customer_id: None,
            vendor_plan_id: None,
            next_billing_date: None,
            canceled_at: None,
        }
    }
}

/// Subscription aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Local identifier; round-tripped as `metadata.subscription_hash`.
    pub id: SubscriptionId,

    /// Parent order the signup charge was recorded against.
    pub order_id: OrderId,

    /// Human-readable name of the subscribed item, also the plan name.
    pub item_name: String,

    pub status: SubscriptionStatus,

    /// Recurring amount in minor units.
    pub recurring_total: i64,

    pub billing_interval: BillingInterval,

    /// Number of billings before completion; 0 = renews until canceled.
    pub bill_times: u32,

    pub trial_days: u32,

    /// Gateway subscription code, set once the gateway confirms the signup.
    pub vendor_subscription_id: Option<String>,

    /// Gateway customer code.
    pub vendor_customer_id: Option<String>,

    /// Gateway plan code this subscription bills against.
    pub vendor_plan_id: Option<String>,

    pub next_billing_date: Option<Timestamp>,

    pub canceled_at: Option<Timestamp>,

    /// Gateway the subscription currently bills through.
    pub current_payment_method: String,

    /// Free-form bag: email token, payment-method snapshot.
    pub meta: Map<String, Value>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a pending subscription attached to its parent order.
    pub fn new(
        order_id: OrderId,
        item_name: impl Into<String>,
        recurring_total: i64,
        billing_interval: BillingInterval,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            order_id,
            item_name: item_name.into(),
            status: SubscriptionStatus::Trialing,
            recurring_total,
            billing_interval,
            bill_times: 0,
            trial_days: 0,
            vendor_subscription_id: None,
            vendor_customer_id: None,
            vendor_plan_id: None,
            next_billing_date: None,
            canceled_at: None,
            current_payment_method: crate::domain::orders::PAYMENT_METHOD.to_string(),
            meta: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a remote-state update; `None` fields keep their current value.
    pub fn apply_update(&mut self, update: &SubscriptionUpdate) {
        self.status = update.status;
        if let Some(code) = &update.vendor_subscription_id {
            self.vendor_subscription_id = Some(code.clone());
        }
        if let Some(code) = &update.vendor_customer_id {
            self.vendor_customer_id = Some(code.clone());
        }
        if let Some(code) = &update.vendor_plan_id {
            self.vendor_plan_id = Some(code.clone());
        }
        if let Some(next) = update.next_billing_date {
            self.next_billing_date = Some(next);
        }
        if let Some(at) = update.canceled_at {
            self.canceled_at = Some(at);
        }
        self.updated_at = Timestamp::now();
    }

    /// Marks the subscription canceled as of `canceled_at`.
    pub fn cancel(&mut self, canceled_at: Timestamp) {
        self.status = SubscriptionStatus::Canceled;
        self.canceled_at = Some(canceled_at);
        self.updated_at = Timestamp::now();
    }

    pub fn email_token(&self) -> Option<&str> {
        self.meta_str(EMAIL_TOKEN_META_KEY)
    }

    pub fn set_email_token(&mut self, token: impl Into<String>) {
        self.meta
            .insert(EMAIL_TOKEN_META_KEY.to_string(), Value::String(token.into()));
        self.updated_at = Timestamp::now();
    }

    /// Stores the billing snapshot of the card the gateway now charges.
    pub fn set_active_payment_method(&mut self, snapshot: &BillingSnapshot) {
        self.meta.insert(
            ACTIVE_PAYMENT_METHOD_META_KEY.to_string(),
            snapshot.to_meta_value(),
        );
        self.updated_at = Timestamp::now();
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}

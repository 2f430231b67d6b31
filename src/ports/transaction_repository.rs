//! Transaction repository port.
//!
//! Persistence contract for charge and refund rows. This is where the two
//! idempotency primitives live: `settle` is a status-guarded compare-and-set
//! so a charge succeeds at most once, and `claim_oldest_placeholder`
//! atomically hands a pending vendor-id-less charge to exactly one caller.
//!
//! # Design
//!
//! - **Scoped lookups**: every gateway-facing lookup pairs the key with a
//!   payment method so rows written by other gateways are never touched
//! - **Write-through values**: `settle` and `claim_oldest_placeholder` take
//!   a [`ChargeSettlement`] and apply it inside the store's critical
//!   section, rather than read-modify-write in the caller

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::foundation::{DomainError, OrderId, SubscriptionId, TransactionId};
use crate::domain::orders::{BillingSnapshot, OrderTransaction};

/// Values written onto a charge when the gateway confirms it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeSettlement {
    /// Gateway charge id.
    pub vendor_charge_id: String,

    /// Confirmed amount in minor units.
    pub total: i64,

    /// Confirmed currency.
    pub currency: String,

    pub card_last_4: Option<String>,

    pub card_brand: Option<String>,

    pub payment_method_type: Option<String>,

    /// Entries merged into the transaction's existing meta; existing keys
    /// not named here are preserved.
    pub meta_patch: Map<String, Value>,
}

impl ChargeSettlement {
    /// Builds a settlement from a charge's billing snapshot.
    pub fn from_billing(
        vendor_charge_id: impl Into<String>,
        total: i64,
        currency: impl Into<String>,
        billing: &BillingSnapshot,
    ) -> Self {
        Self {
            vendor_charge_id: vendor_charge_id.into(),
            total,
            currency: currency.into(),
            card_last_4: billing.last4.clone(),
            card_brand: billing.brand.clone(),
            payment_method_type: Some(billing.payment_type.clone()),
            meta_patch: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta_patch.insert(key.into(), value);
        self
    }
}

/// Result of a settle attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SettleOutcome {
    /// The charge transitioned to succeeded; returns the row as written.
    Applied(OrderTransaction),

    /// The charge was already succeeded; returns the untouched row.
    AlreadySettled(OrderTransaction),
}

impl SettleOutcome {
    pub fn transaction(&self) -> &OrderTransaction {
        match self {
            SettleOutcome::Applied(txn) | SettleOutcome::AlreadySettled(txn) => txn,
        }
    }

    pub fn into_transaction(self) -> OrderTransaction {
        match self {
            SettleOutcome::Applied(txn) | SettleOutcome::AlreadySettled(txn) => txn,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, SettleOutcome::Applied(_))
    }
}

/// Repository port for charge and refund transactions.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Find a transaction by local id, scoped to a payment method.
    ///
    /// Returns `None` when the id is unknown or belongs to another gateway.
    async fn find_by_id_and_method(
        &self,
        id: &TransactionId,
        payment_method: &str,
    ) -> Result<Option<OrderTransaction>, DomainError>;

    /// Find a transaction by gateway charge id, scoped to a payment method.
    async fn find_by_vendor_charge_id(
        &self,
        vendor_charge_id: &str,
        payment_method: &str,
    ) -> Result<Option<OrderTransaction>, DomainError>;

    /// All transactions of an order, oldest first.
    async fn find_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<OrderTransaction>, DomainError>;

    /// Refund transactions of an order, newest first.
    ///
    /// Ordering matters to callers: refund matching walks from the most
    /// recent row so replayed events hit their original row first.
    async fn find_refunds_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<OrderTransaction>, DomainError>;

    /// Insert a new transaction row.
    async fn create(&self, transaction: &OrderTransaction) -> Result<(), DomainError>;

    /// Overwrite an existing transaction row.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the id is unknown
    async fn update(&self, transaction: &OrderTransaction) -> Result<(), DomainError>;

    /// Settle a charge: apply `settlement` and mark it succeeded, if and
    /// only if it is not already succeeded.
    ///
    /// The status check and the write happen atomically with respect to
    /// other settle calls, so a webhook and a browser confirmation racing
    /// on the same charge produce exactly one `Applied`.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the id is unknown
    async fn settle(
        &self,
        id: &TransactionId,
        settlement: ChargeSettlement,
    ) -> Result<SettleOutcome, DomainError>;

    /// Claim the oldest pending, vendor-id-less charge of a subscription by
    /// applying `settlement` to it. Returns `None` when no placeholder is
    /// left to claim.
    ///
    /// Atomic in the same sense as [`settle`](Self::settle): two concurrent
    /// claims never receive the same row.
    async fn claim_oldest_placeholder(
        &self,
        subscription_id: &SubscriptionId,
        settlement: ChargeSettlement,
    ) -> Result<Option<OrderTransaction>, DomainError>;

    /// Add `amount` to a charge's refunded running total.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the id is unknown
    async fn increment_refunded_total(
        &self,
        id: &TransactionId,
        amount: i64,
    ) -> Result<(), DomainError>;
}

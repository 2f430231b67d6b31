//! Charge settlement, the one place a pending charge becomes succeeded.
//!
//! Both the browser confirmation and the `charge.success` webhook funnel into
//! [`SettlementService::confirm_charge`], and both may run for the same
//! charge. Idempotency rests on the repository's settle operation, which only
//! applies the first transition; the losing path sees `AlreadySettled` and
//! backs off without re-auditing or re-refunding.

use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::domain::orders::{Order, OrderTransaction};
use crate::domain::subscriptions::{Subscription, SubscriptionUpdate};
use crate::ports::{
    AuditEntry, AuditLog, ChargePayload, ChargeSettlement, OrderRepository, TransactionRepository,
};

use super::refunds::RefundService;
use super::subscriptions::SubscriptionService;

/// Charge checkouts flagged with this metadata key collected a minimum
/// authorization amount rather than real revenue; it is reversed right after
/// settlement.
pub const AUTHORIZATION_ONLY_META_KEY: &str = "amount_is_for_authorization_only";

/// Distills a gateway charge into the fields written at settlement. Billing
/// details also land in the row's meta, merged over what checkout stored;
/// null fields are dropped so a sparse webhook payload cannot erase details
/// an earlier settlement captured.
pub(crate) fn settlement_from_charge(charge: &ChargePayload) -> ChargeSettlement {
    let billing = charge.billing_snapshot();
    let mut settlement = ChargeSettlement::from_billing(
        charge.vendor_charge_id(),
        charge.amount,
        &charge.currency,
        &billing,
    );
    if let Value::Object(fields) = billing.to_meta_value() {
        settlement
            .meta_patch
            .extend(fields.into_iter().filter(|(_, v)| !v.is_null()));
    }
    settlement
}

pub struct SettlementService {
    orders: Arc<dyn OrderRepository>,
    transactions: Arc<dyn TransactionRepository>,
    audit: Arc<dyn AuditLog>,
    refunds: Arc<RefundService>,
    subscriptions: Arc<SubscriptionService>,
}

impl SettlementService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        transactions: Arc<dyn TransactionRepository>,
        audit: Arc<dyn AuditLog>,
        refunds: Arc<RefundService>,
        subscriptions: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            orders,
            transactions,
            audit,
            refunds,
            subscriptions,
        }
    }

    /// Settles `transaction` with the remote charge and brings the order (and
    /// subscription, for renewals) up to date. Safe to call again for a
    /// charge that already settled.
    ///
    /// For renewal confirmations the caller passes the subscription and the
    /// remote-state update captured when the remote subscription was created;
    /// those are recorded instead of recomputing the order status directly.
    pub async fn confirm_charge(
        &self,
        transaction: &OrderTransaction,
        charge: &ChargePayload,
        subscription: Option<&mut Subscription>,
        subscription_update: Option<&SubscriptionUpdate>,
    ) -> Result<Order, DomainError> {
        let mut order = self
            .orders
            .find_by_id(&transaction.order_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::OrderNotFound, "Order not found"))?;

        if transaction.is_succeeded() {
            return Ok(order);
        }

        let outcome = self
            .transactions
            .settle(&transaction.id, settlement_from_charge(charge))
            .await?;
        if !outcome.was_applied() {
            // A concurrent confirmation won the race and did the bookkeeping
            return Ok(order);
        }
        let settled = outcome.into_transaction();

        self.audit
            .append(AuditEntry::order_info(
                order.id,
                "Payment Confirmation",
                format!(
                    "Payment confirmed via Paystack. Charge: {}",
                    charge.vendor_charge_id()
                ),
            ))
            .await?;

        if charge.metadata_str(AUTHORIZATION_ONLY_META_KEY) == Some("yes") {
            if let Err(err) = self.refunds.refund_authorization_amount(&order, &settled).await {
                error!(
                    order_id = %order.id,
                    error = %err,
                    "Authorization amount reversal failed"
                );
                self.audit
                    .append(AuditEntry::order_error(
                        order.id,
                        "Refund failed of authorization amount",
                        err.message,
                    ))
                    .await?;
            }
        }

        match (subscription, subscription_update) {
            (Some(subscription), Some(update)) => {
                self.subscriptions
                    .record_renewal(&order, subscription, charge, Some(update))
                    .await?;
            }
            _ => {
                self.refresh_order_status(&order.id).await?;
            }
        }

        if let Some(fresh) = self.orders.find_by_id(&order.id).await? {
            order = fresh;
        }
        Ok(order)
    }

    async fn refresh_order_status(&self, order_id: &OrderId) -> Result<(), DomainError> {
        let transactions = self.transactions.find_for_order(order_id).await?;
        let status = Order::status_from_transactions(&transactions);
        self.orders.update_status(order_id, status).await
    }
}

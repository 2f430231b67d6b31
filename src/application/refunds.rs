//! Refund issuance and webhook reconciliation.
//!
//! Refund rows can originate from three places: a merchant-initiated refund,
//! the automatic reversal of an authorization-only charge, and the
//! `refund.processed` webhook. The webhook fires for all of them, so
//! reconciliation has to recognize rows it already wrote before creating new
//! ones. Matching runs newest-first over the order's refund rows:
//!
//! 1. a row carrying the incoming vendor refund id is a replay; only the
//!    amount is corrected if the gateway settled a different figure
//! 2. a row without a vendor id whose amount matches and whose stored
//!    refund id matches is a locally-issued refund the webhook is now
//!    confirming; the vendor id is filled in
//! 3. otherwise the refund happened on the Paystack dashboard and a new row
//!    is created
//!
//! The parent charge's `refunded_total` is only bumped when a new row is
//! created, and reconciliation is serialized per order so a webhook retry
//! racing the first delivery cannot double-book.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::domain::orders::{Order, OrderTransaction, REFUND_ID_META_KEY};
use crate::ports::{
    AuditEntry, AuditLog, CreateRefundRequest, EventNotifier, OrderRepository, PaystackGateway,
    TransactionRepository,
};

/// Refund details extracted from a `refund.processed` webhook.
#[derive(Debug, Clone)]
pub struct IncomingRefund {
    pub vendor_refund_id: String,
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
}

/// What reconciliation did with an incoming refund.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// A new refund row was written and the parent total bumped.
    Created(OrderTransaction),
    /// A locally-issued refund was matched and its vendor id filled in.
    Merged(OrderTransaction),
    /// A replayed refund arrived with a corrected amount.
    Updated(OrderTransaction),
    /// An exact replay; nothing changed.
    Unchanged(OrderTransaction),
}

impl ReconcileOutcome {
    pub fn transaction(&self) -> &OrderTransaction {
        match self {
            ReconcileOutcome::Created(t)
            | ReconcileOutcome::Merged(t)
            | ReconcileOutcome::Updated(t)
            | ReconcileOutcome::Unchanged(t) => t,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, ReconcileOutcome::Created(_))
    }
}

pub struct RefundService {
    gateway: Arc<dyn PaystackGateway>,
    transactions: Arc<dyn TransactionRepository>,
    orders: Arc<dyn OrderRepository>,
    audit: Arc<dyn AuditLog>,
    notifier: Arc<dyn EventNotifier>,
    order_locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl RefundService {
    pub fn new(
        gateway: Arc<dyn PaystackGateway>,
        transactions: Arc<dyn TransactionRepository>,
        orders: Arc<dyn OrderRepository>,
        audit: Arc<dyn AuditLog>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        Self {
            gateway,
            transactions,
            orders,
            audit,
            notifier,
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Records a refund reported by the gateway against `parent`, deduplicating
    /// against rows written by earlier deliveries or local refund calls.
    pub async fn reconcile(
        &self,
        order: &Order,
        parent: &OrderTransaction,
        incoming: IncomingRefund,
    ) -> Result<ReconcileOutcome, DomainError> {
        let lock = self.order_lock(order.id).await;
        let _guard = lock.lock().await;

        let refunds = self.transactions.find_refunds_for_order(&order.id).await?;

        if let Some(existing) = refunds
            .iter()
            .find(|r| r.vendor_charge_id.as_deref() == Some(incoming.vendor_refund_id.as_str()))
        {
            if existing.total != incoming.amount {
                let mut updated = existing.clone();
                updated.total = incoming.amount;
                self.transactions.update(&updated).await?;
                return Ok(ReconcileOutcome::Updated(updated));
            }
            return Ok(ReconcileOutcome::Unchanged(existing.clone()));
        }

        if let Some(placeholder) = refunds.iter().find(|r| {
            r.vendor_charge_id.is_none()
                && r.total == incoming.amount
                && r.meta_str(REFUND_ID_META_KEY) == Some(incoming.vendor_refund_id.as_str())
        }) {
            let mut merged = placeholder.clone();
            merged.vendor_charge_id = Some(incoming.vendor_refund_id.clone());
            self.transactions.update(&merged).await?;
            return Ok(ReconcileOutcome::Merged(merged));
        }

        let mut refund =
            OrderTransaction::new_refund(order.id, parent.id, incoming.amount, &incoming.currency);
        refund.vendor_charge_id = Some(incoming.vendor_refund_id.clone());
        refund.set_meta("refund_source", json!("webhook"));
        if let Some(description) = &incoming.description {
            refund.set_meta("refund_description", json!(description));
        }

        self.transactions.create(&refund).await?;
        self.transactions
            .increment_refunded_total(&parent.id, incoming.amount)
            .await?;
        self.refresh_order_status(&order.id).await?;

        if let Err(err) = self.notifier.order_refunded(order, &refund).await {
            warn!(order_id = %order.id, error = %err, "Refund notification failed");
        }

        Ok(ReconcileOutcome::Created(refund))
    }

    /// Issues a refund against `charge` on Paystack and returns the vendor
    /// refund id. No local rows are written; the caller decides whether to
    /// record the refund immediately or wait for the webhook.
    pub async fn issue_remote_refund(
        &self,
        charge: &OrderTransaction,
        amount: i64,
        reason: Option<&str>,
    ) -> Result<String, DomainError> {
        let vendor_charge_id = charge.vendor_charge_id.as_deref().ok_or_else(|| {
            DomainError::new(ErrorCode::RefundFailed, "Payment ID not found for refund")
        })?;

        let request = CreateRefundRequest {
            transaction: vendor_charge_id.to_string(),
            amount: Some(amount),
            currency: Some(charge.currency.clone()),
            merchant_note: reason.map(describe_reason),
        };

        let refund = self
            .gateway
            .create_refund(request)
            .await
            .map_err(DomainError::from)?;

        if !refund.is_accepted() {
            warn!(
                transaction_id = %charge.id,
                refund_status = %refund.status,
                "Paystack rejected the refund"
            );
            return Err(DomainError::new(
                ErrorCode::RefundFailed,
                "Refund could not be processed. Please try again.",
            ));
        }

        Ok(refund.id.to_string())
    }

    /// Reverses the minimum charge taken when a subscription checkout had
    /// nothing due today. The local row keeps the vendor refund id in meta so
    /// the later `refund.processed` webhook merges instead of duplicating.
    pub async fn refund_authorization_amount(
        &self,
        order: &Order,
        charge: &OrderTransaction,
    ) -> Result<(), DomainError> {
        const REASON: &str = "Refunded amount for authorization transaction";

        let vendor_refund_id = self
            .issue_remote_refund(charge, charge.total, Some(REASON))
            .await?;

        let lock = self.order_lock(order.id).await;
        let _guard = lock.lock().await;

        let mut refund =
            OrderTransaction::new_refund(order.id, charge.id, charge.total, &charge.currency);
        refund.set_meta(REFUND_ID_META_KEY, json!(vendor_refund_id));
        refund.set_meta("reason", json!(REASON));

        self.transactions.create(&refund).await?;
        self.transactions
            .increment_refunded_total(&charge.id, charge.total)
            .await?;

        self.audit
            .append(AuditEntry::order_info(
                order.id,
                "Paystack refund processed",
                "Refund processed for authorization transaction",
            ))
            .await?;

        Ok(())
    }

    async fn refresh_order_status(&self, order_id: &OrderId) -> Result<(), DomainError> {
        let transactions = self.transactions.find_for_order(order_id).await?;
        let status = Order::status_from_transactions(&transactions);
        self.orders.update_status(order_id, status).await
    }

    async fn order_lock(&self, order_id: OrderId) -> Arc<Mutex<()>> {
        let mut locks = self.order_locks.lock().await;
        locks.entry(order_id).or_default().clone()
    }
}

/// Maps the storefront's canned refund reasons to the notes Paystack shows
/// the customer; anything else passes through untouched.
fn describe_reason(reason: &str) -> String {
    match reason {
        "duplicate" => "Duplicate payment".to_string(),
        "fraudulent" => "Fraudulent payment".to_string(),
        "requested_by_customer" => "Requested by customer".to_string(),
        other => other.to_string(),
    }
}

//! Webhook handlers for the gateway events this integration acts on.
//!
//! Each handler receives the decoded event together with the order the
//! resolver matched, does its own payload validation, and delegates the
//! actual state changes to the reconciliation services. Handlers return
//! `Ok(())` for deliveries that are valid but irrelevant (unknown
//! subscription, unpaid invoice, foreign refund); an error from a handler
//! turns into a non-2xx response and a gateway retry.
//!
//! [`default_dispatcher`] wires the production handler set. `invoice.create`
//! is deliberately not registered: acknowledging it unhandled stops the
//! gateway from retrying, and the row it would create is made redundant by
//! the `charge.success` that follows.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, TransactionId};
use crate::domain::orders::{Order, OrderTransaction, PAYMENT_METHOD};
use crate::domain::webhook::WebhookEvent;
use crate::ports::{
    AuditEntry, AuditLog, ChargePayload, OrderRepository, SubscriptionPayload,
    SubscriptionRepository, TransactionRepository,
};

use super::dispatcher::{WebhookDispatcher, WebhookHandler};
use super::refunds::{IncomingRefund, RefundService};
use super::resolver::OrderResolver;
use super::settlement::SettlementService;
use super::subscriptions::SubscriptionService;

/// Settles the local charge row for a `charge.success` delivery.
///
/// Signup charges for subscriptions carry a `paystack_plan` metadata echo;
/// for those the remote subscription is created before settlement so the
/// renewal bookkeeping sees it.
pub struct ChargeSuccessHandler {
    transactions: Arc<dyn TransactionRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    settlement: Arc<SettlementService>,
    subscription_service: Arc<SubscriptionService>,
}

impl ChargeSuccessHandler {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        settlement: Arc<SettlementService>,
        subscription_service: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            transactions,
            subscriptions,
            settlement,
            subscription_service,
        }
    }

    /// Local charge row for this delivery, by the metadata hash echo first
    /// and the reference prefix second.
    async fn find_transaction(
        &self,
        charge: &ChargePayload,
    ) -> Result<Option<OrderTransaction>, DomainError> {
        let Some(id) = charge
            .metadata_str("transaction_hash")
            .and_then(|hash| hash.parse::<TransactionId>().ok())
            .or_else(|| OrderTransaction::id_from_reference(&charge.reference))
        else {
            return Ok(None);
        };
        self.transactions
            .find_by_id_and_method(&id, PAYMENT_METHOD)
            .await
    }
}

#[async_trait]
impl WebhookHandler for ChargeSuccessHandler {
    async fn handle(&self, event: &WebhookEvent, order: &Order) -> Result<(), DomainError> {
        let charge: ChargePayload = serde_json::from_value(event.data.clone()).map_err(|err| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Malformed charge payload: {err}"),
            )
        })?;

        let Some(transaction) = self.find_transaction(&charge).await? else {
            return Err(DomainError::new(
                ErrorCode::TransactionNotFound,
                "Transaction not found",
            ));
        };
        if transaction.is_succeeded() {
            // Replayed delivery, or the redirect confirmation got here first.
            return Ok(());
        }

        let mut subscription = None;
        let mut update = None;
        if charge.metadata_str("paystack_plan").is_some() {
            subscription = self.subscriptions.find_by_order_id(&order.id).await?;
            if let Some(subscription) = subscription.as_mut() {
                let customer_code = charge.customer_code().unwrap_or(&order.customer_email);
                update = self
                    .subscription_service
                    .ensure_remote_subscription(
                        order,
                        subscription,
                        customer_code,
                        charge.authorization_code(),
                    )
                    .await?;
            }
        }

        self.settlement
            .confirm_charge(&transaction, &charge, subscription.as_mut(), update.as_ref())
            .await?;
        Ok(())
    }
}

/// Absorbs the gateway's own `subscription.create` notification.
///
/// The remote subscription normally exists because this integration created
/// it, so the interesting payload here is what creation did not return:
/// the email token and the first real billing date.
pub struct SubscriptionCreateHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    subscription_service: Arc<SubscriptionService>,
}

impl SubscriptionCreateHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        subscription_service: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            subscriptions,
            subscription_service,
        }
    }
}

#[async_trait]
impl WebhookHandler for SubscriptionCreateHandler {
    async fn handle(&self, event: &WebhookEvent, order: &Order) -> Result<(), DomainError> {
        let payload: SubscriptionPayload =
            serde_json::from_value(event.data.clone()).map_err(|err| {
                DomainError::new(
                    ErrorCode::ValidationFailed,
                    format!("Malformed subscription payload: {err}"),
                )
            })?;

        let Some(mut subscription) = self.subscriptions.find_by_order_id(&order.id).await? else {
            return Ok(());
        };
        // A paused or dead local subscription outranks a late create event.
        if !subscription.status.is_running() {
            return Ok(());
        }

        self.subscription_service
            .adopt_remote_subscription(order, &mut subscription, &payload)
            .await
    }
}

/// Resyncs the subscription when the gateway reports a paid invoice.
///
/// Renewal charges are gateway-initiated and carry none of our checkout
/// metadata, so `charge.success` cannot record them; the paid invoice is
/// the signal that the remote charge history has a row we have not seen.
pub struct InvoiceUpdateHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    subscription_service: Arc<SubscriptionService>,
}

impl InvoiceUpdateHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        subscription_service: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            subscriptions,
            subscription_service,
        }
    }
}

/// The gateway has sent `paid` as both a boolean and a 0/1 integer.
fn invoice_paid(event: &WebhookEvent) -> bool {
    event.data.get("paid").map_or(false, |paid| {
        paid.as_bool().unwrap_or(false) || paid.as_i64() == Some(1)
    })
}

#[async_trait]
impl WebhookHandler for InvoiceUpdateHandler {
    async fn handle(&self, event: &WebhookEvent, order: &Order) -> Result<(), DomainError> {
        if event.str_at("/status") != Some("success") || !invoice_paid(event) {
            return Ok(());
        }
        let Some(code) = event.subscription_code() else {
            return Ok(());
        };
        let Some(mut subscription) = self
            .subscriptions
            .find_by_vendor_subscription_id(code)
            .await?
        else {
            return Ok(());
        };
        if subscription.status.is_terminal() {
            return Ok(());
        }

        self.subscription_service
            .resync(order, &mut subscription)
            .await
    }
}

/// Handles `subscription.not_renew`: the customer or the gateway turned off
/// renewal, so the remote status is now authoritative for cancellation.
pub struct SubscriptionCanceledHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    subscription_service: Arc<SubscriptionService>,
    audit: Arc<dyn AuditLog>,
}

impl SubscriptionCanceledHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        subscription_service: Arc<SubscriptionService>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            subscriptions,
            subscription_service,
            audit,
        }
    }
}

#[async_trait]
impl WebhookHandler for SubscriptionCanceledHandler {
    async fn handle(&self, event: &WebhookEvent, order: &Order) -> Result<(), DomainError> {
        let Some(code) = event.subscription_code() else {
            return Ok(());
        };
        let Some(mut subscription) = self
            .subscriptions
            .find_by_vendor_subscription_id(code)
            .await?
        else {
            return Ok(());
        };
        if subscription.status.is_terminal() {
            return Ok(());
        }

        // The resync folds in the remote status (non-renewing maps to
        // canceled) and picks up any final charge at the same time.
        self.subscription_service
            .resync(order, &mut subscription)
            .await?;

        self.audit
            .append(AuditEntry::subscription_info(
                subscription.id,
                "Subscription Cancelled",
                format!("Paystack reported the subscription will not renew. Code: {code}"),
            ))
            .await?;
        Ok(())
    }
}

/// Reconciles `refund.processed` against the local refund rows.
pub struct RefundProcessedHandler {
    transactions: Arc<dyn TransactionRepository>,
    refunds: Arc<RefundService>,
}

impl RefundProcessedHandler {
    pub fn new(transactions: Arc<dyn TransactionRepository>, refunds: Arc<RefundService>) -> Self {
        Self {
            transactions,
            refunds,
        }
    }

    async fn find_parent(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<OrderTransaction>, DomainError> {
        let Some(id) = event
            .transaction_reference()
            .and_then(OrderTransaction::id_from_reference)
        else {
            return Ok(None);
        };
        self.transactions
            .find_by_id_and_method(&id, PAYMENT_METHOD)
            .await
    }
}

#[async_trait]
impl WebhookHandler for RefundProcessedHandler {
    async fn handle(&self, event: &WebhookEvent, order: &Order) -> Result<(), DomainError> {
        // No local charge to attach the refund to; acknowledge and move on
        // rather than have the gateway retry forever.
        let Some(parent) = self.find_parent(event).await? else {
            return Ok(());
        };
        let Some(vendor_refund_id) = event.id_at("/id") else {
            return Ok(());
        };
        let Some(amount) = event.amount() else {
            return Ok(());
        };

        let incoming = IncomingRefund {
            vendor_refund_id,
            amount,
            currency: event
                .currency()
                .unwrap_or(parent.currency.as_str())
                .to_string(),
            description: event.str_at("/merchant_note").map(str::to_string),
        };
        self.refunds.reconcile(order, &parent, incoming).await?;
        Ok(())
    }
}

/// Builds the production dispatcher with every handled event registered.
#[allow(clippy::too_many_arguments)]
pub fn default_dispatcher(
    orders: Arc<dyn OrderRepository>,
    transactions: Arc<dyn TransactionRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    audit: Arc<dyn AuditLog>,
    settlement: Arc<SettlementService>,
    subscription_service: Arc<SubscriptionService>,
    refunds: Arc<RefundService>,
) -> WebhookDispatcher {
    let resolver = OrderResolver::new(orders, transactions.clone(), subscriptions.clone());
    let mut dispatcher = WebhookDispatcher::new(resolver);

    dispatcher.register(
        "charge.success",
        Arc::new(ChargeSuccessHandler::new(
            transactions.clone(),
            subscriptions.clone(),
            settlement,
            subscription_service.clone(),
        )),
    );
    dispatcher.register(
        "subscription.create",
        Arc::new(SubscriptionCreateHandler::new(
            subscriptions.clone(),
            subscription_service.clone(),
        )),
    );
    dispatcher.register(
        "subscription.not_renew",
        Arc::new(SubscriptionCanceledHandler::new(
            subscriptions.clone(),
            subscription_service.clone(),
            audit,
        )),
    );
    dispatcher.register(
        "invoice.update",
        Arc::new(InvoiceUpdateHandler::new(
            subscriptions,
            subscription_service,
        )),
    );
    dispatcher.register(
        "refund.processed",
        Arc::new(RefundProcessedHandler::new(transactions, refunds)),
    );

    dispatcher
}

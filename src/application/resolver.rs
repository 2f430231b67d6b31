//! Order resolution for inbound webhook events.
//!
//! Every webhook must be tied back to a local order before any handler
//! runs. Events carry different identifying keys depending on their type and
//! on how the charge was initiated, so resolution tries a fixed chain of
//! strategies and takes the first that lands:
//!
//! 1. `data.metadata.order_hash` - echoed checkout metadata
//! 2. `data.transaction_reference` - merchant reference, `<txn-id>_<unix-ts>`
//! 3. `data.subscription_code` (top-level or nested) - subscription events
//! 4. `data.email_token` - cancellation events
//!
//! A strategy that finds its key but fails the lookup falls through to the
//! next one rather than aborting: renewal events in particular echo stale
//! metadata from the first checkout.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, OrderId};
use crate::domain::orders::{Order, OrderTransaction, PAYMENT_METHOD};
use crate::domain::webhook::WebhookEvent;
use crate::ports::{OrderRepository, SubscriptionRepository, TransactionRepository};

/// Resolves webhook events to the order they belong to.
pub struct OrderResolver {
    orders: Arc<dyn OrderRepository>,
    transactions: Arc<dyn TransactionRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl OrderResolver {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        transactions: Arc<dyn TransactionRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            orders,
            transactions,
            subscriptions,
        }
    }

    /// Runs the resolution chain; `None` means no strategy produced an order.
    pub async fn resolve(&self, event: &WebhookEvent) -> Result<Option<Order>, DomainError> {
        if let Some(order) = self.by_order_hash(event).await? {
            return Ok(Some(order));
        }
        if let Some(order) = self.by_transaction_reference(event).await? {
            return Ok(Some(order));
        }
        if let Some(order) = self.by_subscription_code(event).await? {
            return Ok(Some(order));
        }
        self.by_email_token(event).await
    }

    async fn by_order_hash(&self, event: &WebhookEvent) -> Result<Option<Order>, DomainError> {
        let Some(id) = event.order_hash().and_then(|h| h.parse::<OrderId>().ok()) else {
            return Ok(None);
        };
        self.orders.find_by_id(&id).await
    }

    async fn by_transaction_reference(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<Order>, DomainError> {
        let Some(id) = event
            .transaction_reference()
            .and_then(OrderTransaction::id_from_reference)
        else {
            return Ok(None);
        };

        let Some(transaction) = self
            .transactions
            .find_by_id_and_method(&id, PAYMENT_METHOD)
            .await?
        else {
            return Ok(None);
        };

        self.orders.find_by_id(&transaction.order_id).await
    }

    async fn by_subscription_code(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<Order>, DomainError> {
        let Some(code) = event.subscription_code() else {
            return Ok(None);
        };

        let Some(subscription) = self
            .subscriptions
            .find_by_vendor_subscription_id(code)
            .await?
        else {
            return Ok(None);
        };

        self.orders.find_by_id(&subscription.order_id).await
    }

    async fn by_email_token(&self, event: &WebhookEvent) -> Result<Option<Order>, DomainError> {
        let Some(token) = event.email_token() else {
            return Ok(None);
        };

        let Some(subscription) = self.subscriptions.find_by_email_token(token).await? else {
            return Ok(None);
        };

        self.orders.find_by_id(&subscription.order_id).await
    }
}

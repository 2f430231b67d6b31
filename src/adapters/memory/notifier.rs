//! In-memory event notifier.
//!
//! Records reconciliation outcomes instead of broadcasting them. Stands in
//! for the storefront's notification pipeline (customer emails, admin
//! alerts) in tests and single-process setups.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, SubscriptionId, TransactionId};
use crate::domain::orders::{Order, OrderTransaction};
use crate::domain::subscriptions::Subscription;
use crate::ports::EventNotifier;

/// In-memory implementation of the `EventNotifier` port.
#[derive(Default)]
pub struct InMemoryNotifier {
    activations: Mutex<Vec<SubscriptionId>>,
    refunds: Mutex<Vec<(OrderId, TransactionId)>>,
}

impl InMemoryNotifier {
    /// Creates a new notifier with no recorded events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriptions reported as activated, in order.
    pub fn activations(&self) -> Vec<SubscriptionId> {
        self.activations.lock().unwrap().clone()
    }

    /// Number of activation notifications sent.
    pub fn activation_count(&self) -> usize {
        self.activations.lock().unwrap().len()
    }

    /// `(order, refund transaction)` pairs reported as refunded.
    pub fn refund_notifications(&self) -> Vec<(OrderId, TransactionId)> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventNotifier for InMemoryNotifier {
    async fn subscription_activated(
        &self,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        tracing::info!(
            subscription_id = %subscription.id,
            status = subscription.status.as_str(),
            "Subscription activated"
        );

        self.activations.lock().unwrap().push(subscription.id);
        Ok(())
    }

    async fn order_refunded(
        &self,
        order: &Order,
        refund: &OrderTransaction,
    ) -> Result<(), DomainError> {
        tracing::info!(
            order_id = %order.id,
            refund_id = %refund.id,
            amount = refund.total,
            "Order refunded"
        );

        self.refunds.lock().unwrap().push((order.id, refund.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::orders::{OrderMode, OrderType};
    use crate::domain::subscriptions::BillingInterval;

    #[tokio::test]
    async fn records_activations_and_refunds() {
        let notifier = InMemoryNotifier::new();
        let order = Order::new(
            OrderType::Normal,
            OrderMode::Test,
            "Ada",
            "ada@example.com",
            1000,
            "NGN",
        );
        let sub = Subscription::new(order.id, "Pro", 1000, BillingInterval::Monthly);
        let charge = OrderTransaction::new_charge(order.id, 1000, "NGN");
        let refund = OrderTransaction::new_refund(order.id, charge.id, 1000, "NGN");

        notifier.subscription_activated(&sub).await.unwrap();
        notifier.order_refunded(&order, &refund).await.unwrap();

        assert_eq!(notifier.activations(), vec![sub.id]);
        assert_eq!(notifier.refund_notifications(), vec![(order.id, refund.id)]);
    }
}

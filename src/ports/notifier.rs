//! Reconciliation event notifier port.
//!
//! Hook points the surrounding storefront listens on: customer emails,
//! fulfillment triggers, and integrations hang off these. Notification
//! failures are logged and swallowed by callers; they never roll back a
//! reconciliation that already committed.

use async_trait::async_trait;

use crate::domain::orders::{Order, OrderTransaction};
use crate::domain::subscriptions::Subscription;

use crate::domain::foundation::DomainError;

/// Port for broadcasting reconciliation outcomes.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    /// A subscription transitioned into active or trialing.
    async fn subscription_activated(&self, subscription: &Subscription)
        -> Result<(), DomainError>;

    /// A new refund row was recorded against an order.
    ///
    /// Fires only for newly created rows, not for replays that matched an
    /// existing refund.
    async fn order_refunded(
        &self,
        order: &Order,
        refund: &OrderTransaction,
    ) -> Result<(), DomainError>;
}

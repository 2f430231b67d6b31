//! Subscription repository port.
//!
//! Lookups cover the four ways an inbound event can name a subscription:
//! local id (checkout metadata), vendor code (lifecycle webhooks), email
//! token (cancellation links), and parent order (charge events).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, SubscriptionId};
use crate::domain::subscriptions::Subscription;

/// Repository port for subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription by its id.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Find the subscription attached to an order.
    ///
    /// Each order owns at most one subscription.
    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find a subscription by its gateway subscription code.
    async fn find_by_vendor_subscription_id(
        &self,
        vendor_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find a subscription by the gateway email token stored in its meta.
    async fn find_by_email_token(
        &self,
        email_token: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Overwrite an existing subscription row.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the id is unknown
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}

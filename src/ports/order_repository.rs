//! Order repository port.
//!
//! Read side plus the one write reconciliation performs on orders: updating
//! the derived payment status. Order creation belongs to checkout, outside
//! this core.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId};
use crate::domain::orders::{Order, OrderStatus};

/// Repository port for orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order by its id.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Persist a recomputed aggregate status.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the id is unknown
    async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), DomainError>;
}

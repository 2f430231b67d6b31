//! Order aggregate entity.
//!
//! Orders are created by the checkout flow before this core runs; the
//! reconciliation core only recomputes their aggregate payment status from
//! the transactions it settles, it never creates or deletes them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, ProductId, Timestamp, VariationId};

use super::{OrderTransaction, TransactionStatus, TransactionType};

/// Whether an order is a first purchase or a scheduled renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Normal,
    Renewal,
}

/// Checkout mode the order was placed in; part of the plan fingerprint so
/// test and live plans never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    Test,
    Live,
}

impl OrderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderMode::Test => "test",
            OrderMode::Live => "live",
        }
    }
}

/// Aggregate payment status, derived from the order's transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// No successful charge yet.
    Pending,
    /// At least one succeeded charge, nothing refunded.
    Paid,
    /// Refunds cover part of the charged amount.
    PartiallyRefunded,
    /// Refunds cover the full charged amount.
    Refunded,
}

/// Order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Public order identifier; round-tripped as `metadata.order_hash`.
    pub id: OrderId,

    pub order_type: OrderType,

    pub status: OrderStatus,

    pub mode: OrderMode,

    pub customer_name: String,

    pub customer_email: String,

    /// Order total in minor units.
    pub total: i64,

    /// ISO currency code, uppercase.
    pub currency: String,

    /// Product the order was placed against (plan fingerprint input).
    pub product_id: Option<ProductId>,

    /// Variation within the product, when the product has any.
    pub variation_id: Option<VariationId>,

    pub created_at: Timestamp,
}

impl Order {
    /// Creates a pending order, the state checkout hands to this core.
    pub fn new(
        order_type: OrderType,
        mode: OrderMode,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        total: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            order_type,
            status: OrderStatus::Pending,
            mode,
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            total,
            currency: currency.into(),
            product_id: None,
            variation_id: None,
            created_at: Timestamp::now(),
        }
    }

    pub fn is_renewal(&self) -> bool {
        self.order_type == OrderType::Renewal
    }

    /// Recomputes the aggregate status from the order's transactions.
    ///
    /// Succeeded charges establish `Paid`; refund transactions then pull the
    /// status toward `Refunded` as their sum approaches the charged amount.
    pub fn status_from_transactions(transactions: &[OrderTransaction]) -> OrderStatus {
        let charged: i64 = transactions
            .iter()
            .filter(|t| {
                t.transaction_type == TransactionType::Charge
                    && t.status == TransactionStatus::Succeeded
            })
            .map(|t| t.total)
            .sum();

        if charged == 0 {
            return OrderStatus::Pending;
        }

        let refunded: i64 = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Refund)
            .map(|t| t.total)
            .sum();

        if refunded == 0 {
            OrderStatus::Paid
        } else if refunded >= charged {
            OrderStatus::Refunded
        } else {
            OrderStatus::PartiallyRefunded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            OrderType::Normal,
            OrderMode::Test,
            "Ada Obi",
            "ada@example.com",
            10_000,
            "NGN",
        )
    }

    fn succeeded_charge(order_id: OrderId, total: i64) -> OrderTransaction {
        let mut txn = OrderTransaction::new_charge(order_id, total, "NGN");
        txn.status = TransactionStatus::Succeeded;
        txn
    }

    #[test]
    fn new_order_starts_pending() {
        let order = order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_renewal());
    }

    #[test]
    fn status_without_succeeded_charge_is_pending() {
        let order = order();
        let txn = OrderTransaction::new_charge(order.id, 10_000, "NGN");
        assert_eq!(
            Order::status_from_transactions(&[txn]),
            OrderStatus::Pending
        );
    }

    #[test]
    fn status_with_succeeded_charge_is_paid() {
        let order = order();
        let txn = succeeded_charge(order.id, 10_000);
        assert_eq!(Order::status_from_transactions(&[txn]), OrderStatus::Paid);
    }

    #[test]
    fn partial_refund_marks_partially_refunded() {
        let order = order();
        let charge = succeeded_charge(order.id, 10_000);
        let refund = OrderTransaction::new_refund(order.id, charge.id, 4_000, "NGN");
        assert_eq!(
            Order::status_from_transactions(&[charge, refund]),
            OrderStatus::PartiallyRefunded
        );
    }

    #[test]
    fn full_refund_marks_refunded() {
        let order = order();
        let charge = succeeded_charge(order.id, 10_000);
        let refund = OrderTransaction::new_refund(order.id, charge.id, 10_000, "NGN");
        assert_eq!(
            Order::status_from_transactions(&[charge, refund]),
            OrderStatus::Refunded
        );
    }
}

//! Orders domain module.
//!
//! Orders and the charge/refund transactions recorded against them.
//!
//! # Module Structure
//!
//! - `order` - Order aggregate and derived payment status
//! - `transaction` - Charge/refund transaction entity and billing snapshot

mod order;
mod transaction;

pub use order::{Order, OrderMode, OrderStatus, OrderType};
pub use transaction::{
    BillingSnapshot, OrderTransaction, TransactionStatus, TransactionType, PAYMENT_METHOD,
    REFUND_ID_META_KEY,
};

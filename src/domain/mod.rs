//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, money, errors, timestamps)
//! - `orders` - Order aggregate and charge/refund transactions
//! - `subscriptions` - Subscription lifecycle and plan fingerprinting
//! - `webhook` - Webhook signature verification and event decoding

pub mod foundation;
pub mod orders;
pub mod subscriptions;
pub mod webhook;

//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `OrderRepository` - Order lookup and derived-status writes
//! - `TransactionRepository` - Charge/refund rows, settle CAS, placeholder claim
//! - `SubscriptionRepository` - Subscription lookups by id/code/token/order
//! - `PlanCache` - Plan-terms fingerprint → gateway plan code
//!
//! ## Gateway Port
//!
//! - `PaystackGateway` - Remote REST API (transactions, plans, subscriptions,
//!   refunds)
//!
//! ## Side-channel Ports
//!
//! - `AuditLog` - Append-only merchant-visible activity trail
//! - `EventNotifier` - Activation/refund hooks for the surrounding storefront

mod audit_log;
mod notifier;
mod order_repository;
mod paystack;
mod plan_cache;
mod subscription_repository;
mod transaction_repository;

pub use audit_log::{AuditEntry, AuditLevel, AuditLog, AuditModule};
pub use notifier::EventNotifier;
pub use order_repository::OrderRepository;
pub use paystack::{
    ChargePayload, CheckoutSession, CreatePlanRequest, CreateRefundRequest,
    CreateSubscriptionRequest, GatewayError, GatewayErrorCode, InitializeTransactionRequest,
    PaystackGateway, PlanPayload, RefundPayload, SubscriptionPayload, TransactionListQuery,
    TransactionPage,
};
pub use plan_cache::PlanCache;
pub use subscription_repository::SubscriptionRepository;
pub use transaction_repository::{
    ChargeSettlement, SettleOutcome, TransactionRepository,
};

//! Cartflow - Paystack payment reconciliation core
//!
//! Takes authoritative payment facts from Paystack, delivered through three
//! independent and possibly duplicated channels (redirect confirmation,
//! signed webhooks, manual resync), and applies them exactly once to local
//! order, transaction, and subscription state.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

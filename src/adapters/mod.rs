//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application core to the outside world:
//! - `paystack` - Paystack REST API client and its test double
//! - `memory` - In-memory persistence, audit trail, and notifier
//! - `http` - Axum endpoints for webhook intake and payment confirmation

pub mod http;
pub mod memory;
pub mod paystack;

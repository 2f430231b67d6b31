//! HTTP adapters - REST endpoints exposed to the gateway and the storefront.

pub mod paystack;

pub use paystack::{paystack_router, PaystackAppState};

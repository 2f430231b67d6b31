//! HTTP surface of the Paystack integration: the webhook intake and the
//! browser-redirect confirmation endpoint.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::PaystackAppState;
pub use routes::paystack_router;

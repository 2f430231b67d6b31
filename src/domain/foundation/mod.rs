//! Foundation module - Shared domain primitives.
//!
//! Contains the identifiers, value objects, and error types that form the
//! vocabulary of the Cartflow payment domain.

mod errors;
mod ids;
mod money;
mod nonce;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OrderId, ProductId, SubscriptionId, TransactionId, VariationId};
pub use money::{
    ensure_supported_currency, is_supported_currency, minimum_authorization_amount,
    normalize_currency, DEFAULT_AUTHORIZATION_MINIMUM, SUPPORTED_CURRENCIES,
};
pub use nonce::{ConfirmationNonce, DEFAULT_NONCE_LIFETIME_SECS};
pub use timestamp::Timestamp;

//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("Currency '{currency}' is not supported by Paystack")]
    UnsupportedCurrency { currency: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported currency error.
    pub fn unsupported_currency(currency: impl Into<String>) -> Self {
        ValidationError::UnsupportedCurrency {
            currency: currency.into(),
        }
    }
}

/// Error codes organized by category.
///
/// Three families matter to callers: validation errors reject the request
/// before any state mutation, not-found errors reject without mutation, and
/// gateway errors surface a remote failure the caller decides how to absorb.
/// There is deliberately no conflict code: idempotency guards no-op instead
/// of erroring, so a replay is indistinguishable from first success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,
    EmptyField,
    InvalidFormat,
    InvalidNonce,
    UnsupportedCurrency,
    MissingEmailToken,

    // Not found errors
    OrderNotFound,
    TransactionNotFound,
    SubscriptionNotFound,

    // Remote gateway errors
    GatewayError,
    InitializationFailed,
    RefundFailed,
    CancellationFailed,

    // Authorization errors
    Unauthorized,

    // Infrastructure errors
    StorageError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::EmptyField => "EMPTY_FIELD",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::InvalidNonce => "INVALID_NONCE",
            ErrorCode::UnsupportedCurrency => "UNSUPPORTED_CURRENCY",
            ErrorCode::MissingEmailToken => "MISSING_EMAIL_TOKEN",
            ErrorCode::OrderNotFound => "ORDER_NOT_FOUND",
            ErrorCode::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::GatewayError => "GATEWAY_ERROR",
            ErrorCode::InitializationFailed => "INITIALIZATION_FAILED",
            ErrorCode::RefundFailed => "REFUND_FAILED",
            ErrorCode::CancellationFailed => "CANCELLATION_FAILED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

impl ErrorCode {
    /// True for codes that describe a missing entity rather than a bad request
    /// or a remote failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ErrorCode::OrderNotFound
                | ErrorCode::TransactionNotFound
                | ErrorCode::SubscriptionNotFound
        )
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            details: HashMap::new(),
        }
        .with_detail("field", field.into())
    }

    /// Creates a remote gateway error carrying the gateway's own message.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GatewayError, message)
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let code = match &err {
            ValidationError::EmptyField { .. } => ErrorCode::EmptyField,
            ValidationError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            ValidationError::UnsupportedCurrency { .. } => ErrorCode::UnsupportedCurrency,
        };
        DomainError::new(code, err.to_string())
    }
}

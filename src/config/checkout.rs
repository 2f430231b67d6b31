//! Checkout and confirmation configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Checkout-side configuration: where confirmed shoppers land and how the
/// confirmation nonce is signed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutConfig {
    /// Base URL of the storefront receipt page; the order id is appended
    pub receipt_base_url: String,

    /// Secret for the confirmation nonce HMAC. Independent of the gateway
    /// key so rotating one does not invalidate the other.
    pub nonce_secret: String,
}

impl CheckoutConfig {
    /// Validate checkout configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.receipt_base_url.is_empty() {
            return Err(ValidationError::MissingRequired("CHECKOUT_RECEIPT_BASE_URL"));
        }
        if !self.receipt_base_url.starts_with("http://")
            && !self.receipt_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidReceiptUrl);
        }
        if self.nonce_secret.is_empty() {
            return Err(ValidationError::MissingRequired("CHECKOUT_NONCE_SECRET"));
        }
        Ok(())
    }
}

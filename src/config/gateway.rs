//! Paystack gateway configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Paystack gateway configuration.
///
/// The same secret key authenticates outbound API calls and verifies the
/// HMAC on inbound webhooks; Paystack does not issue a separate webhook
/// secret.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Paystack secret key (`sk_test_...` or `sk_live_...`)
    pub secret_key: String,

    /// API base URL override, for tests against a stub server
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl GatewayConfig {
    /// Check if using Paystack test mode
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Check if using Paystack live mode
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }

    /// Validate gateway configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_SECRET_KEY"));
        }
        if !self.secret_key.starts_with("sk_") {
            return Err(ValidationError::InvalidSecretKey);
        }
        // A live key outside production charges real cards from a test rig
        if self.is_live_mode() && *environment != Environment::Production {
            return Err(ValidationError::LiveKeyOutsideProduction);
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.paystack.co".to_string()
}

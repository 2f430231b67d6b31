//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `CARTFLOW` prefix and nested values use `__` as the separator.
//!
//! # Example
//!
//! ```no_run
//! use cartflow::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod checkout;
mod error;
mod gateway;
mod server;

pub use checkout::CheckoutConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Paystack gateway configuration (secret key, API base URL)
    pub gateway: GatewayConfig,

    /// Checkout configuration (receipt URL, nonce secret)
    pub checkout: CheckoutConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads a `.env` file when present, then reads environment variables
    /// with the `CARTFLOW` prefix, `__` separating nested values:
    ///
    /// - `CARTFLOW__GATEWAY__SECRET_KEY=sk_test_x` -> `gateway.secret_key`
    /// - `CARTFLOW__SERVER__PORT=8080` -> `server.port`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when required variables are missing or a value
    /// cannot be parsed into its typed field.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("CARTFLOW").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.gateway.validate(&self.server.environment)?;
        self.checkout.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

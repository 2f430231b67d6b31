//! Tracing subscriber setup for embedding hosts.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, else from the configured
/// `log_level`. Production emits JSON lines for log shippers; other
/// environments get the human-readable format. The global subscriber can
/// only be installed once per process, so hosts call this from `main`.
pub fn init_telemetry(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

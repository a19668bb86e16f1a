//! Telemetry setup for zone-edit.
//!
//! Installs a `tracing` subscriber. Metrics go through the `metrics` facade;
//! embedding applications install whichever recorder they use.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

/// Initialize tracing. `RUST_LOG` overrides the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

//! Configuration types for zone-edit.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mutation engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Privileged helper configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Mutation engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name of the lock serializing zone transactions.
    /// One name shared by all zones.
    #[serde(default = "default_lock_name")]
    pub lock_name: String,

    /// Seconds to wait for the lock before giving up. `None` waits forever.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: Option<u64>,
}

impl EngineConfig {
    /// Lock timeout as a duration.
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_name: default_lock_name(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

/// Privileged helper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Helper command line, program first (e.g. `["sudo", "-n", "/usr/local/sbin/zone-helper"]`).
    /// The verb and zone are appended.
    #[serde(default = "default_helper")]
    pub helper: Vec<String>,

    /// File zone text is staged through between the helper and the engine.
    #[serde(default = "default_working_file")]
    pub working_file: PathBuf,

    /// Seconds a single helper invocation may run before it is killed.
    #[serde(default = "default_helper_timeout_secs")]
    pub helper_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            helper: default_helper(),
            working_file: default_working_file(),
            helper_timeout_secs: default_helper_timeout_secs(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "zone_edit=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_lock_name() -> String {
    "named".to_string()
}

fn default_lock_timeout_secs() -> Option<u64> {
    Some(60)
}

fn default_helper() -> Vec<String> {
    vec![
        "sudo".to_string(),
        "-n".to_string(),
        "/usr/local/sbin/zone-helper".to_string(),
    ]
}

fn default_working_file() -> PathBuf {
    PathBuf::from(".tmp/named")
}

fn default_helper_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.engine.lock_name, "named");
        assert_eq!(config.engine.lock_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.gateway.helper_timeout_secs, 30);
        assert_eq!(config.gateway.working_file, PathBuf::from(".tmp/named"));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_lock_timeout_can_be_disabled() {
        let config: Config =
            serde_json::from_str(r#"{"engine": {"lock_timeout_secs": null}}"#).unwrap();
        assert_eq!(config.engine.lock_timeout(), None);
        assert_eq!(config.engine.lock_name, "named");
    }
}

//! Global configuration types for the cadence service.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls how
//! the API reaches the durable-execution substrate and how the worker runs
//! side effects. Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.cadence/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub substrate: SubstrateConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// How the API server reaches the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstrateMode {
    /// Host the substrate inside the API process.
    Embedded,
    /// Talk to a `cadence worker` over HTTP.
    Remote,
}

/// Connection settings for the substrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstrateConfig {
    #[serde(default = "default_mode")]
    pub mode: SubstrateMode,

    /// Base URL of the worker (remote mode).
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_task_queue")]
    pub task_queue: String,

    /// Delay between background reconnect attempts.
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,

    /// Per-request timeout for remote calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_mode() -> SubstrateMode {
    SubstrateMode::Remote
}

fn default_address() -> String {
    "http://127.0.0.1:7233".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_task_queue() -> String {
    "cadence-task-queue".to_string()
}

fn default_reconnect_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            address: default_address(),
            namespace: default_namespace(),
            task_queue: default_task_queue(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Settings for the process that hosts engine instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Attempts to open the journal before giving up.
    #[serde(default = "default_connect_max_attempts")]
    pub connect_max_attempts: u32,

    #[serde(default = "default_connect_retry_delay_secs")]
    pub connect_retry_delay_secs: u64,

    /// Start-to-close timeout for a single delivery attempt.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    #[serde(default = "default_send_max_attempts")]
    pub send_max_attempts: u32,

    /// Backoff before the second attempt; doubles after each failure.
    #[serde(default = "default_send_initial_backoff_ms")]
    pub send_initial_backoff_ms: u64,
}

fn default_connect_max_attempts() -> u32 {
    10
}

fn default_connect_retry_delay_secs() -> u64 {
    5
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_send_max_attempts() -> u32 {
    3
}

fn default_send_initial_backoff_ms() -> u64 {
    1_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            connect_max_attempts: default_connect_max_attempts(),
            connect_retry_delay_secs: default_connect_retry_delay_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            send_max_attempts: default_send_max_attempts(),
            send_initial_backoff_ms: default_send_initial_backoff_ms(),
        }
    }
}

/// Tracing export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Bridge spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.substrate.mode, SubstrateMode::Remote);
        assert_eq!(config.substrate.address, "http://127.0.0.1:7233");
        assert_eq!(config.substrate.namespace, "default");
        assert_eq!(config.substrate.task_queue, "cadence-task-queue");
        assert_eq!(config.substrate.reconnect_interval_secs, 10);
        assert_eq!(config.worker.connect_max_attempts, 10);
        assert_eq!(config.worker.send_timeout_secs, 30);
        assert!(!config.telemetry.otel);
    }

    #[test]
    fn test_global_config_deserialize_empty() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.substrate.task_queue, "cadence-task-queue");
        assert_eq!(config.worker.send_max_attempts, 3);
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
[substrate]
mode = "embedded"
namespace = "staging"
reconnect_interval_secs = 2

[worker]
send_max_attempts = 5

[telemetry]
otel = true
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.substrate.mode, SubstrateMode::Embedded);
        assert_eq!(config.substrate.namespace, "staging");
        assert_eq!(config.substrate.reconnect_interval_secs, 2);
        // Unspecified fields keep their defaults
        assert_eq!(config.substrate.address, "http://127.0.0.1:7233");
        assert_eq!(config.worker.send_max_attempts, 5);
        assert_eq!(config.worker.send_timeout_secs, 30);
        assert!(config.telemetry.otel);
    }
}

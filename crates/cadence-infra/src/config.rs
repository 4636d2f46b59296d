//! Global configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.cadence/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies environment overrides.

use std::path::{Path, PathBuf};

use cadence_types::config::GlobalConfig;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "CADENCE_DATA_DIR";
pub const SUBSTRATE_ADDRESS_ENV: &str = "CADENCE_SUBSTRATE_ADDRESS";
pub const NAMESPACE_ENV: &str = "CADENCE_NAMESPACE";
pub const TASK_QUEUE_ENV: &str = "CADENCE_TASK_QUEUE";

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - Missing file: defaults.
/// - Unreadable or unparsable file: logs a warning, defaults.
///
/// Environment overrides are applied in every case.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let mut config = read_config_file(data_dir).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn read_config_file(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Override substrate settings from the environment.
///
/// `lookup` is `std::env::var` in production; tests pass a closure.
pub fn apply_env_overrides(config: &mut GlobalConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(address) = non_empty(SUBSTRATE_ADDRESS_ENV) {
        config.substrate.address = address;
    }
    if let Some(namespace) = non_empty(NAMESPACE_ENV) {
        config.substrate.namespace = namespace;
    }
    if let Some(task_queue) = non_empty(TASK_QUEUE_ENV) {
        config.substrate.task_queue = task_queue;
    }
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `CADENCE_DATA_DIR` environment variable
/// 2. `~/.cadence`
/// 3. `.cadence` in the working directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".cadence");
    }

    PathBuf::from(".cadence")
}

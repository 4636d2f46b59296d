//! `cadence check`: report whether the configured substrate answers.

use std::path::Path;

use anyhow::Result;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use console::style;
use serde::Serialize;

use cadence_core::substrate::{ConnectionManager, ConnectionState, ConnectionStatus};
use cadence_infra::substrate::RemoteSubstrateClient;
use cadence_types::config::{GlobalConfig, SubstrateMode};

use crate::state::open_embedded_substrate;

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub mode: SubstrateMode,
    pub address: String,
    pub namespace: String,
    pub task_queue: String,
    pub state: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckReport {
    fn new(config: &GlobalConfig, address: String, status: ConnectionStatus) -> Self {
        Self {
            mode: config.substrate.mode,
            address,
            namespace: config.substrate.namespace.clone(),
            task_queue: config.substrate.task_queue.clone(),
            state: status.state,
            detail: status.detail,
        }
    }

    pub fn healthy(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Probe the substrate once. Embedded mode opens (and recovers) the local
/// journal; remote mode pings the worker.
pub async fn run_check(config: &GlobalConfig, data_dir: &Path) -> Result<CheckReport> {
    let connection = ConnectionManager::new();

    let report = match config.substrate.mode {
        SubstrateMode::Embedded => {
            let substrate = open_embedded_substrate(config, data_dir).await?;
            connection.connect(&substrate).await;
            substrate.shutdown().await;
            CheckReport::new(config, data_dir.display().to_string(), connection.status())
        }
        SubstrateMode::Remote => {
            let client = RemoteSubstrateClient::from_config(&config.substrate)?;
            connection.connect(&client).await;
            CheckReport::new(config, client.base_url().to_string(), connection.status())
        }
    };
    Ok(report)
}

pub fn render_table(report: &CheckReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Setting", "Value"]);

    let mode = match report.mode {
        SubstrateMode::Embedded => "embedded",
        SubstrateMode::Remote => "remote",
    };
    table.add_row(vec!["mode", mode]);
    table.add_row(vec!["address", report.address.as_str()]);
    table.add_row(vec!["namespace", report.namespace.as_str()]);
    table.add_row(vec!["task queue", report.task_queue.as_str()]);
    table.add_row(vec!["state".to_string(), report.state.to_string()]);
    if let Some(detail) = &report.detail {
        table.add_row(vec!["detail", detail.as_str()]);
    }
    table
}

/// Print the report. Returns whether the substrate is reachable.
pub async fn check(config: &GlobalConfig, data_dir: &Path, json: bool) -> Result<bool> {
    let report = run_check(config, data_dir).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.healthy());
    }

    println!();
    let mark = if report.healthy() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("  {} Substrate {}", mark, style(report.state).bold());
    println!();
    println!("{}", render_table(&report));
    println!();

    Ok(report.healthy())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn embedded_check_connects() {
        let dir = TempDir::new().unwrap();
        let mut config = GlobalConfig::default();
        config.substrate.mode = SubstrateMode::Embedded;

        let report = run_check(&config, dir.path()).await.unwrap();
        assert!(report.healthy());
        assert!(report.detail.is_none());
    }

    #[tokio::test]
    async fn unreachable_worker_reports_disconnected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = GlobalConfig::default();
        config.substrate.address = format!("http://{addr}");
        config.substrate.request_timeout_secs = 1;

        let dir = TempDir::new().unwrap();
        let report = run_check(&config, dir.path()).await.unwrap();
        assert!(!report.healthy());
        assert_eq!(report.state, ConnectionState::Disconnected);

        let rendered = render_table(&report).to_string();
        assert!(rendered.contains("disconnected"));
        assert!(rendered.contains("detail"));
    }
}

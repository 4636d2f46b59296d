//! Cadence CLI, REST API and worker entry point.
//!
//! Binary name: `cadence`
//!
//! - `serve`: REST API backed by a remote worker or, with `--embedded`, by a
//!   substrate hosted in-process.
//! - `worker`: hosts the substrate and serves it over HTTP.
//! - `check`: pings the configured substrate.

mod cli;
mod http;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use cadence_core::substrate::ConnectionManager;
use cadence_infra::config::{load_global_config, resolve_data_dir};
use cadence_infra::substrate::RemoteSubstrateClient;
use cadence_observe::tracing_setup::{init_tracing, shutdown_tracing};
use cadence_types::config::{GlobalConfig, SubstrateMode};

use cli::{Cli, Commands};
use state::{AnySubstrate, AppState, open_embedded_substrate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir();
    let config = load_global_config(&data_dir).await;

    init_tracing(cli.verbose, cli.quiet, config.telemetry.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli, config, data_dir).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, mut config: GlobalConfig, data_dir: std::path::PathBuf) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, host, embedded } => {
            if embedded {
                config.substrate.mode = SubstrateMode::Embedded;
            }

            let substrate = match config.substrate.mode {
                SubstrateMode::Embedded => {
                    AnySubstrate::Embedded(open_embedded_substrate(&config, &data_dir).await?)
                }
                SubstrateMode::Remote => {
                    AnySubstrate::Remote(RemoteSubstrateClient::from_config(&config.substrate)?)
                }
            };
            let substrate = Arc::new(substrate);

            let cancel = CancellationToken::new();
            let connection = Arc::new(ConnectionManager::new());
            let reconnect = connection.spawn(
                Arc::clone(&substrate),
                Duration::from_secs(config.substrate.reconnect_interval_secs.max(1)),
                cancel.clone(),
            );

            let state = AppState::new(
                Arc::clone(&substrate),
                connection,
                &config.substrate.task_queue,
            );

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} Cadence API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            cancel.cancel();
            let _ = reconnect.await;
            if let AnySubstrate::Embedded(local) = substrate.as_ref() {
                local.shutdown().await;
            }

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Worker { port, host } => {
            let substrate = Arc::new(open_embedded_substrate(&config, &data_dir).await?);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} Cadence worker on {} (namespace '{}', task queue '{}')",
                    console::style("⚙").bold(),
                    console::style(format!("http://{addr}")).cyan(),
                    substrate.namespace(),
                    substrate.task_queue()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::worker::build_worker_router(Arc::clone(&substrate));
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            substrate.shutdown().await;
            if !cli.quiet {
                println!("\n  Worker stopped.");
            }
        }

        Commands::Check => {
            let healthy = cli::check::check(&config, &data_dir, cli.json).await?;
            if !healthy {
                anyhow::bail!("substrate is not reachable");
            }
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

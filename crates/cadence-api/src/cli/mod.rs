//! CLI command definitions for the `cadence` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod check;

use clap::{Parser, Subcommand};

/// Run contact cadences on a durable-execution substrate.
#[derive(Parser)]
#[command(name = "cadence", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "3000", env = "PORT")]
        port: u16,

        /// Host address to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Host the substrate in this process instead of connecting to a worker.
        #[arg(long)]
        embedded: bool,
    },

    /// Host the substrate and serve it to API servers.
    Worker {
        #[arg(long, default_value = "7233")]
        port: u16,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Check that the configured substrate is reachable.
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["cadence", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { port, host, embedded } => {
                assert_eq!(port, 3000);
                assert_eq!(host, "127.0.0.1");
                assert!(!embedded);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cadence", "worker", "--port", "9000", "-vv", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Worker { port: 9000, .. }));
    }

    #[test]
    fn embedded_flag() {
        let cli = Cli::try_parse_from(["cadence", "serve", "--embedded", "--port", "8080"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve { port: 8080, embedded: true, .. }
        ));
    }
}

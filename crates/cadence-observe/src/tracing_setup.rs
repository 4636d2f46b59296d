//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! // Warnings and errors only, no OTel
//! cadence_observe::tracing_setup::init_tracing(0, false, false).unwrap();
//!
//! // Workspace crates at debug, spans exported to stdout
//! cadence_observe::tracing_setup::init_tracing(1, false, true).unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::attrs::{SERVICE_NAME, WORKSPACE_TARGETS};

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Filter directive for the CLI verbosity flags.
///
/// `RUST_LOG`, when set, takes precedence over this default.
pub fn default_filter(verbose: u8, quiet: bool) -> String {
    match verbose {
        0 if quiet => "error".to_string(),
        0 => "info".to_string(),
        1 => {
            let targets: Vec<String> = WORKSPACE_TARGETS
                .iter()
                .map(|t| format!("{t}=debug"))
                .collect();
            format!("info,{}", targets.join(","))
        }
        _ => "trace".to_string(),
    }
}

/// Initialize the global tracing subscriber.
///
/// - Always installs a `fmt` layer.
/// - When `enable_otel` is true, additionally bridges tracing spans to
///   OpenTelemetry using a stdout exporter.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(
    verbose: u8,
    quiet: bool,
    enable_otel: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(verbose > 0);

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(SERVICE_NAME);
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_selects_filter() {
        assert_eq!(default_filter(0, true), "error");
        assert_eq!(default_filter(0, false), "info");
        assert_eq!(default_filter(3, false), "trace");

        let verbose = default_filter(1, false);
        assert!(verbose.starts_with("info,"));
        assert!(verbose.contains("cadence_core=debug"));
    }

    #[test]
    fn default_filters_parse() {
        for (verbose, quiet) in [(0, true), (0, false), (1, false), (2, false)] {
            assert!(EnvFilter::try_new(default_filter(verbose, quiet)).is_ok());
        }
    }
}

//! Names shared by the tracing setup and exported spans.

/// Service name reported to OpenTelemetry.
pub const SERVICE_NAME: &str = "cadence";

/// Targets of the workspace crates, raised to `debug` by `-v`.
pub const WORKSPACE_TARGETS: &[&str] = &["cadence", "cadence_api", "cadence_core", "cadence_infra"];

//! Observability setup for the cadence engine.
//!
//! - [`tracing_setup`]: subscriber initialization with an optional
//!   OpenTelemetry bridge.
//! - [`attrs`]: span and event field names shared across crates.

pub mod attrs;
pub mod tracing_setup;

//! Shared domain types for the cadence engine.
//!
//! Actions, cadence definitions, enrollments, engine execution state, journal
//! entries, bus events, configuration and the error enums shared by every
//! other crate in the workspace.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod action;
pub mod cadence;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod event;
pub mod execution;
pub mod history;

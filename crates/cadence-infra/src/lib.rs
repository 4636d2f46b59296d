//! Infrastructure layer for the cadence engine.
//!
//! Implements the ports defined in `cadence-core`: in-memory definition and
//! enrollment stores, in-memory and SQLite workflow journals, the in-process
//! substrate that hosts engine instances, the HTTP client for a remote
//! worker, the logging mailer, and the config loader.

pub mod config;
pub mod mailer;
pub mod memory;
pub mod sqlite;
pub mod substrate;

//! Core logic for the cadence engine.
//!
//! Holds the execution engine (pure state machine, async run loop, journal
//! replay), the repository and substrate ports, the connection manager, the
//! event bus and the definition/enrollment services. Storage and transport
//! live in `cadence-infra`; this crate depends only on `cadence-types`.

pub mod engine;
pub mod event;
pub mod repository;
pub mod service;
pub mod substrate;

//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (cadence-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod cadence;
pub mod enrollment;
pub mod history;

//! Substrate implementations.
//!
//! - [`local::LocalSubstrate`] hosts engine instances in this process, backed
//!   by a workflow journal.
//! - [`remote::RemoteSubstrateClient`] talks to a `cadence worker` over HTTP.

pub mod local;
pub mod remote;

pub use local::{LocalContext, LocalSubstrate, LocalSubstrateConfig};
pub use remote::RemoteSubstrateClient;

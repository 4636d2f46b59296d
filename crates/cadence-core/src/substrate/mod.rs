//! Durable-execution substrate port.
//!
//! The enrollment coordinator reaches engine instances only through
//! [`SubstrateClient`]. `cadence-infra` provides an in-process substrate and
//! an HTTP client for a remote worker.

pub mod connection;

use cadence_types::action::Action;
use cadence_types::error::SubstrateError;
use cadence_types::execution::{ExecutionState, StartEngineRequest};

pub use connection::{ConnectionManager, ConnectionState, ConnectionStatus};

/// Operations the coordinator consumes from a substrate.
pub trait SubstrateClient: Send + Sync {
    /// Start a new engine instance. Duplicate workflow ids fail with
    /// `AlreadyStarted`.
    fn start_engine(
        &self,
        request: StartEngineRequest,
    ) -> impl std::future::Future<Output = Result<(), SubstrateError>> + Send;

    /// Deliver a mutation signal. Accepted signals are applied in send order.
    fn signal_mutate(
        &self,
        workflow_id: &str,
        actions: Vec<Action>,
    ) -> impl std::future::Future<Output = Result<(), SubstrateError>> + Send;

    /// Read-only snapshot of an instance's state.
    fn query_state(
        &self,
        workflow_id: &str,
    ) -> impl std::future::Future<Output = Result<ExecutionState, SubstrateError>> + Send;

    /// Cheap reachability check used by the connection manager.
    fn ping(&self) -> impl std::future::Future<Output = Result<(), SubstrateError>> + Send;
}

impl<T: SubstrateClient> SubstrateClient for std::sync::Arc<T> {
    fn start_engine(
        &self,
        request: StartEngineRequest,
    ) -> impl std::future::Future<Output = Result<(), SubstrateError>> + Send {
        (**self).start_engine(request)
    }

    fn signal_mutate(
        &self,
        workflow_id: &str,
        actions: Vec<Action>,
    ) -> impl std::future::Future<Output = Result<(), SubstrateError>> + Send {
        (**self).signal_mutate(workflow_id, actions)
    }

    fn query_state(
        &self,
        workflow_id: &str,
    ) -> impl std::future::Future<Output = Result<ExecutionState, SubstrateError>> + Send {
        (**self).query_state(workflow_id)
    }

    fn ping(&self) -> impl std::future::Future<Output = Result<(), SubstrateError>> + Send {
        (**self).ping()
    }
}

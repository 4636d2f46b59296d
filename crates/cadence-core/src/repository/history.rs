//! Workflow journal trait.
//!
//! The journal is the substrate's durable record of every engine instance.
//! Entries are append-only and numbered per workflow starting at 1.

use cadence_types::error::RepositoryError;
use cadence_types::history::{HistoryEvent, HistoryRecord};

pub trait HistoryRepository: Send + Sync {
    /// Append `event` to the workflow's journal and return its sequence number.
    ///
    /// Appending `WorkflowStarted` to a workflow that already has a journal
    /// fails with `Conflict`.
    fn append(
        &self,
        workflow_id: &str,
        event: &HistoryEvent,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// The full journal in sequence order. Empty if the workflow is unknown.
    fn load(
        &self,
        workflow_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryRecord>, RepositoryError>> + Send;

    /// Workflows whose journal has no terminal entry yet.
    fn list_open_workflows(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;
}

impl<T: HistoryRepository> HistoryRepository for std::sync::Arc<T> {
    fn append(
        &self,
        workflow_id: &str,
        event: &HistoryEvent,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send {
        (**self).append(workflow_id, event)
    }

    fn load(
        &self,
        workflow_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryRecord>, RepositoryError>> + Send {
        (**self).load(workflow_id)
    }

    fn list_open_workflows(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send {
        (**self).list_open_workflows()
    }
}

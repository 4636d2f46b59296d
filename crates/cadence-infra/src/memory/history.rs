//! In-memory workflow journal.
//!
//! Used by the embedded substrate in tests and whenever no data directory is
//! wanted. Nothing survives a restart.

use std::sync::Arc;

use cadence_core::repository::history::HistoryRepository;
use cadence_types::error::RepositoryError;
use cadence_types::history::{HistoryEvent, HistoryRecord};
use chrono::Utc;
use dashmap::DashMap;

#[derive(Debug, Clone, Default)]
pub struct InMemoryHistoryRepository {
    journals: Arc<DashMap<String, Vec<HistoryRecord>>>,
}

impl InMemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryRepository for InMemoryHistoryRepository {
    async fn append(&self, workflow_id: &str, event: &HistoryEvent) -> Result<u64, RepositoryError> {
        let mut journal = self.journals.entry(workflow_id.to_string()).or_default();
        if matches!(event, HistoryEvent::WorkflowStarted { .. }) && !journal.is_empty() {
            return Err(RepositoryError::Conflict(format!(
                "workflow {workflow_id} already has a journal"
            )));
        }

        let seq = journal.len() as u64 + 1;
        journal.push(HistoryRecord {
            workflow_id: workflow_id.to_string(),
            seq,
            event: event.clone(),
            recorded_at: Utc::now(),
        });
        Ok(seq)
    }

    async fn load(&self, workflow_id: &str) -> Result<Vec<HistoryRecord>, RepositoryError> {
        Ok(self
            .journals
            .get(workflow_id)
            .map(|j| j.value().clone())
            .unwrap_or_default())
    }

    async fn list_open_workflows(&self) -> Result<Vec<String>, RepositoryError> {
        let mut open: Vec<String> = self
            .journals
            .iter()
            .filter(|j| !j.value().is_empty() && !j.value().iter().any(|r| r.event.is_terminal()))
            .map(|j| j.key().clone())
            .collect();
        open.sort();
        Ok(open)
    }
}

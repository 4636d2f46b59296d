//! SQLite workflow journal.
//!
//! Implements `HistoryRepository` from `cadence-core`. Each journal entry is
//! one row keyed by `(workflow_id, seq)`; the event itself is stored as a JSON
//! payload next to its `event_type` so open workflows can be found without
//! decoding payloads.

use cadence_core::repository::history::HistoryRepository;
use cadence_types::error::RepositoryError;
use cadence_types::history::{HistoryEvent, HistoryRecord};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `HistoryRepository`.
#[derive(Clone)]
pub struct SqliteHistoryRepository {
    pool: DatabasePool,
}

impl SqliteHistoryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct HistoryRow {
    workflow_id: String,
    seq: i64,
    payload: String,
    recorded_at: String,
}

impl HistoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            workflow_id: row.try_get("workflow_id")?,
            seq: row.try_get("seq")?,
            payload: row.try_get("payload")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }

    fn into_record(self) -> Result<HistoryRecord, RepositoryError> {
        let event: HistoryEvent = serde_json::from_str(&self.payload)
            .map_err(|e| RepositoryError::Query(format!("invalid history payload: {e}")))?;
        Ok(HistoryRecord {
            workflow_id: self.workflow_id,
            seq: self.seq as u64,
            event,
            recorded_at: parse_datetime(&self.recorded_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// HistoryRepository impl
// ---------------------------------------------------------------------------

impl HistoryRepository for SqliteHistoryRepository {
    async fn append(&self, workflow_id: &str, event: &HistoryEvent) -> Result<u64, RepositoryError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| RepositoryError::Query(format!("serialize history event: {e}")))?;

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let last: (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(seq), 0) FROM workflow_history WHERE workflow_id = ?",
        )
        .bind(workflow_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(query_err)?;

        if matches!(event, HistoryEvent::WorkflowStarted { .. }) && last.0 > 0 {
            return Err(RepositoryError::Conflict(format!(
                "workflow {workflow_id} already has a journal"
            )));
        }

        let seq = last.0 + 1;
        sqlx::query(
            r#"INSERT INTO workflow_history (workflow_id, seq, event_type, payload, recorded_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(workflow_id)
        .bind(seq)
        .bind(event.kind())
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;
        Ok(seq as u64)
    }

    async fn load(&self, workflow_id: &str) -> Result<Vec<HistoryRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT workflow_id, seq, payload, recorded_at
               FROM workflow_history
               WHERE workflow_id = ?
               ORDER BY seq ASC"#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| {
                HistoryRow::from_row(row)
                    .map_err(query_err)
                    .and_then(HistoryRow::into_record)
            })
            .collect()
    }

    async fn list_open_workflows(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT DISTINCT workflow_id
               FROM workflow_history
               WHERE workflow_id NOT IN (
                   SELECT workflow_id FROM workflow_history
                   WHERE event_type IN ('workflow_completed', 'workflow_failed')
               )
               ORDER BY workflow_id"#,
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use cadence_types::action::Action;
    use cadence_types::execution::{EngineInput, SendReceipt};

    use super::*;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn started() -> HistoryEvent {
        HistoryEvent::WorkflowStarted {
            input: EngineInput {
                actions: vec![Action::send("s1", "Welcome", "Hello"), Action::wait("w1", 10)],
                subject_contact: "ada@example.com".to_string(),
                definition_id: "cad_1".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn append_and_load_preserves_order_and_payload() {
        let repo = SqliteHistoryRepository::new(test_pool().await);
        let receipt = SendReceipt {
            success: true,
            confirmation_id: "msg_1".to_string(),
            timestamp: Utc::now(),
        };

        assert_eq!(repo.append("wf-1", &started()).await.unwrap(), 1);
        assert_eq!(
            repo.append(
                "wf-1",
                &HistoryEvent::MessageSent {
                    cursor: 0,
                    receipt: receipt.clone()
                }
            )
            .await
            .unwrap(),
            2
        );
        repo.append(
            "wf-1",
            &HistoryEvent::SignalReceived {
                seq: 1,
                actions: vec![Action::wait("w2", 3)],
            },
        )
        .await
        .unwrap();

        let journal = repo.load("wf-1").await.unwrap();
        let seqs: Vec<u64> = journal.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(journal[0].event, started());
        assert_eq!(
            journal[1].event,
            HistoryEvent::MessageSent { cursor: 0, receipt }
        );
    }

    #[tokio::test]
    async fn duplicate_start_conflicts() {
        let repo = SqliteHistoryRepository::new(test_pool().await);
        repo.append("wf-1", &started()).await.unwrap();
        assert!(matches!(
            repo.append("wf-1", &started()).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn journals_are_per_workflow() {
        let repo = SqliteHistoryRepository::new(test_pool().await);
        repo.append("wf-a", &started()).await.unwrap();
        assert_eq!(repo.append("wf-b", &started()).await.unwrap(), 1);
        assert!(repo.load("wf-unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_workflows_exclude_terminal_journals() {
        let repo = SqliteHistoryRepository::new(test_pool().await);
        repo.append("wf-done", &started()).await.unwrap();
        repo.append("wf-done", &HistoryEvent::WorkflowCompleted)
            .await
            .unwrap();
        repo.append("wf-failed", &started()).await.unwrap();
        repo.append(
            "wf-failed",
            &HistoryEvent::WorkflowFailed {
                error: "smtp down".to_string(),
            },
        )
        .await
        .unwrap();
        repo.append("wf-live", &started()).await.unwrap();

        assert_eq!(repo.list_open_workflows().await.unwrap(), vec!["wf-live"]);
    }

    #[tokio::test]
    async fn journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("reopen.db").display());

        {
            let repo = SqliteHistoryRepository::new(DatabasePool::new(&url).await.unwrap());
            repo.append("wf-1", &started()).await.unwrap();
        }

        let repo = SqliteHistoryRepository::new(DatabasePool::new(&url).await.unwrap());
        assert_eq!(repo.load("wf-1").await.unwrap().len(), 1);
        assert_eq!(repo.list_open_workflows().await.unwrap(), vec!["wf-1"]);
    }
}

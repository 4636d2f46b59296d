//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. `DatabasePool` pairs a
//! multi-connection reader pool with a single-connection writer pool, which
//! also serializes journal appends so sequence numbers never race.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Split read/write pool for SQLite with WAL mode.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open both pools and run embedded migrations on the writer.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // Migrations must exist before the read-only pool opens.
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }

    /// Open the pool, retrying up to `max_attempts` times `delay` apart.
    pub async fn connect_with_retry(
        database_url: &str,
        max_attempts: u32,
        delay: Duration,
    ) -> Result<Self, sqlx::Error> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match Self::new(database_url).await {
                Ok(pool) => {
                    tracing::info!(attempt, "journal database opened");
                    return Ok(pool);
                }
                Err(err) if attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "failed to open journal database, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// `sqlite://{data_dir}/cadence.db`
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}/cadence.db", data_dir.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_creates_history_table() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let pool = DatabasePool::new(&url).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(table_names, vec!["workflow_history"]);
    }

    #[tokio::test]
    async fn test_pool_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("wal.db").display());

        let pool = DatabasePool::new(&url).await.unwrap();

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(result.0.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        // A directory that does not exist cannot hold the database file.
        let url = "sqlite:///nonexistent-cadence-dir/sub/cadence.db";
        let result = DatabasePool::connect_with_retry(url, 2, Duration::from_millis(1)).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_database_url() {
        let url = database_url(Path::new("/tmp/cadence"));
        assert_eq!(url, "sqlite:///tmp/cadence/cadence.db");
    }
}

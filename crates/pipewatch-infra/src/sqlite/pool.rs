//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time, so checkpoints go through a
//! single-connection writer pool while queries use a small reader pool.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// File name of the execution store inside the data directory.
pub const DATABASE_FILE: &str = "pipewatch.db";

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: up to 8 connections for concurrent SELECT queries.
/// - `writer`: one connection for serialized upserts.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if needed) the database and run embedded migrations on
    /// the writer before the reader pool is opened.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(base_opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        tracing::debug!(url = database_url, "opened execution database");
        Ok(Self { reader, writer })
    }

    /// Open the store at `{data_dir}/pipewatch.db`.
    pub async fn open_in(data_dir: &Path) -> Result<Self, sqlx::Error> {
        Self::new(&database_url_for(data_dir)).await
    }
}

/// `sqlite://` URL for the store inside `data_dir`.
pub fn database_url_for(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join(DATABASE_FILE).display())
}

/// Database URL for the resolved data directory (`PIPEWATCH_DATA_DIR` or
/// `~/.pipewatch`).
pub fn default_database_url() -> String {
    database_url_for(&crate::filesystem::resolve_data_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_creates_executions_table() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open_in(dir.path()).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(table_names, vec!["executions"]);
        assert!(dir.path().join(DATABASE_FILE).exists());
    }

    #[tokio::test]
    async fn test_pool_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open_in(dir.path()).await.unwrap();

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(result.0.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        drop(DatabasePool::open_in(dir.path()).await.unwrap());
        DatabasePool::open_in(dir.path()).await.unwrap();
    }

    #[test]
    fn test_database_url_for() {
        let url = database_url_for(Path::new("/srv/pipewatch"));
        assert_eq!(url, "sqlite:///srv/pipewatch/pipewatch.db?mode=rwc");
        assert!(default_database_url().starts_with("sqlite://"));
    }
}

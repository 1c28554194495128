//! SQLite execution repository implementation.
//!
//! Implements `ExecutionRepository` from `pipewatch-core`. Each execution is
//! one row holding the full JSON snapshot plus the columns needed for
//! filtering, ordering and the version check.

use chrono::{DateTime, SecondsFormat, Utc};
use pipewatch_core::repository::execution::ExecutionRepository;
use pipewatch_types::error::RepositoryError;
use pipewatch_types::execution::{Execution, ExecutionFilter, ExecutionStatus, StatusCounts};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ExecutionRepository`.
#[derive(Clone)]
pub struct SqliteExecutionRepository {
    pool: DatabasePool,
}

impl SqliteExecutionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct ExecutionRow {
    id: String,
    document: String,
}

impl ExecutionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            document: row.try_get("document")?,
        })
    }

    fn into_execution(self) -> Result<Execution, RepositoryError> {
        serde_json::from_str(&self.document).map_err(|e| {
            RepositoryError::Query(format!("invalid execution document {}: {e}", self.id))
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn rows_into_executions(
    rows: &[sqlx::sqlite::SqliteRow],
) -> Result<Vec<Execution>, RepositoryError> {
    let mut executions = Vec::with_capacity(rows.len());
    for row in rows {
        let r = ExecutionRow::from_row(row).map_err(query_error)?;
        executions.push(r.into_execution()?);
    }
    Ok(executions)
}

// ---------------------------------------------------------------------------
// ExecutionRepository impl
// ---------------------------------------------------------------------------

impl ExecutionRepository for SqliteExecutionRepository {
    async fn upsert(&self, execution: &Execution) -> Result<(), RepositoryError> {
        let document = serde_json::to_string(execution)
            .map_err(|e| RepositoryError::Query(format!("serialize execution: {e}")))?;
        let version = i64::try_from(execution.version)
            .map_err(|_| RepositoryError::Query(format!("version {} out of range", execution.version)))?;

        let result = sqlx::query(
            r#"INSERT INTO executions
               (id, workflow_id, status, start_time, end_time, version, document, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 workflow_id = excluded.workflow_id,
                 status = excluded.status,
                 start_time = excluded.start_time,
                 end_time = excluded.end_time,
                 version = excluded.version,
                 document = excluded.document,
                 updated_at = excluded.updated_at
               WHERE executions.version < excluded.version"#,
        )
        .bind(execution.id.to_string())
        .bind(&execution.workflow_id)
        .bind(execution.status.as_str())
        .bind(format_datetime(&execution.start_time))
        .bind(execution.end_time.as_ref().map(format_datetime))
        .bind(version)
        .bind(&document)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "execution {} already stored at version >= {}",
                execution.id, execution.version
            )));
        }
        Ok(())
    }

    async fn find_one(&self, id: &Uuid) -> Result<Option<Execution>, RepositoryError> {
        let row = sqlx::query("SELECT id, document FROM executions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let r = ExecutionRow::from_row(&row).map_err(query_error)?;
                Ok(Some(r.into_execution()?))
            }
            None => Ok(None),
        }
    }

    async fn find(&self, filter: &ExecutionFilter) -> Result<Vec<Execution>, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT id, document FROM executions WHERE 1 = 1");
        if let Some(workflow_id) = &filter.workflow_id {
            query.push(" AND workflow_id = ").push_bind(workflow_id.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query
            .push(" ORDER BY start_time DESC, id DESC LIMIT ")
            .push_bind(i64::from(filter.limit));

        let rows = query
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;
        rows_into_executions(&rows)
    }

    async fn count_by_status(&self) -> Result<StatusCounts, RepositoryError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM executions GROUP BY status")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut counts = StatusCounts::default();
        for row in &rows {
            let status: String = row.try_get("status").map_err(query_error)?;
            let n: i64 = row.try_get("n").map_err(query_error)?;
            let n = u64::try_from(n).unwrap_or_default();
            match status.parse::<ExecutionStatus>() {
                Ok(ExecutionStatus::Running) => counts.running = n,
                Ok(ExecutionStatus::Completed) => counts.completed = n,
                Ok(ExecutionStatus::Failed) => counts.failed = n,
                Err(e) => return Err(RepositoryError::Query(e)),
            }
        }
        Ok(counts)
    }

    async fn list_running(&self) -> Result<Vec<Execution>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, document FROM executions WHERE status = 'running' ORDER BY start_time ASC, id ASC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;
        rows_into_executions(&rows)
    }
}

//! Execution repository trait definition.
//!
//! Documents are full `Execution` snapshots keyed by execution id. The
//! infrastructure layer (pipewatch-infra) implements this trait with SQLite;
//! [`super::memory::InMemoryExecutionRepository`] covers tests and embedded use.

use pipewatch_types::error::RepositoryError;
use pipewatch_types::execution::{Execution, ExecutionFilter, StatusCounts};
use uuid::Uuid;

/// Repository trait for execution snapshots.
///
/// Writes are version-stamped: `upsert` must reject a snapshot whose
/// `version` is not strictly greater than the stored one with
/// [`RepositoryError::Conflict`]. That is what lets a stale writer notice that
/// another runner has taken over the execution.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ExecutionRepository: Send + Sync {
    /// Insert or replace the snapshot for `execution.id`.
    fn upsert(
        &self,
        execution: &Execution,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Load one execution by id.
    fn find_one(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Execution>, RepositoryError>> + Send;

    /// Query executions, newest `start_time` first, truncated to `filter.limit`.
    fn find(
        &self,
        filter: &ExecutionFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Execution>, RepositoryError>> + Send;

    /// Count persisted executions per status.
    fn count_by_status(
        &self,
    ) -> impl std::future::Future<Output = Result<StatusCounts, RepositoryError>> + Send;

    /// All executions still marked running, oldest first.
    fn list_running(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Execution>, RepositoryError>> + Send;
}

impl<T: ExecutionRepository> ExecutionRepository for std::sync::Arc<T> {
    fn upsert(
        &self,
        execution: &Execution,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send {
        (**self).upsert(execution)
    }

    fn find_one(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Execution>, RepositoryError>> + Send {
        (**self).find_one(id)
    }

    fn find(
        &self,
        filter: &ExecutionFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Execution>, RepositoryError>> + Send {
        (**self).find(filter)
    }

    fn count_by_status(
        &self,
    ) -> impl std::future::Future<Output = Result<StatusCounts, RepositoryError>> + Send {
        (**self).count_by_status()
    }

    fn list_running(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Execution>, RepositoryError>> + Send {
        (**self).list_running()
    }
}

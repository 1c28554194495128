//! Checkpoint manager for execution snapshots.
//!
//! Wraps an `ExecutionRepository` and writes the full `Execution` after every
//! state change. Write failures are logged and swallowed so a flaky store
//! never aborts a running workflow. The one failure that is reported back is
//! a version conflict, which means another runner has written a newer
//! snapshot of the same execution.

use pipewatch_types::error::RepositoryError;
use pipewatch_types::execution::Execution;
use uuid::Uuid;

use crate::repository::execution::ExecutionRepository;

/// Result of a checkpoint write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// The snapshot is durable.
    Saved,
    /// The write failed and was logged. The run continues.
    Swallowed,
    /// The store holds a newer snapshot. This runner no longer owns the
    /// execution.
    Stale,
}

/// Persists execution snapshots.
///
/// Generic over `R: ExecutionRepository` so it works with any storage backend
/// (SQLite, in-memory, etc.).
pub struct CheckpointManager<R: ExecutionRepository> {
    repo: R,
}

impl<R: ExecutionRepository> CheckpointManager<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Bump the execution's version and upsert the snapshot.
    pub async fn save(&self, execution: &mut Execution) -> CheckpointOutcome {
        execution.version += 1;

        match self.repo.upsert(execution).await {
            Ok(()) => {
                tracing::debug!(
                    execution_id = %execution.id,
                    version = execution.version,
                    cursor = execution.cursor,
                    status = %execution.status,
                    "checkpointed execution"
                );
                CheckpointOutcome::Saved
            }
            Err(RepositoryError::Conflict(detail)) => {
                tracing::warn!(
                    execution_id = %execution.id,
                    version = execution.version,
                    detail = %detail,
                    "checkpoint rejected, a newer snapshot exists"
                );
                CheckpointOutcome::Stale
            }
            Err(e) => {
                tracing::warn!(
                    execution_id = %execution.id,
                    version = execution.version,
                    error = %e,
                    "checkpoint write failed, continuing"
                );
                CheckpointOutcome::Swallowed
            }
        }
    }

    /// Load the persisted snapshot of an execution.
    pub async fn load(&self, execution_id: &Uuid) -> Result<Option<Execution>, RepositoryError> {
        self.repo.find_one(execution_id).await
    }
}

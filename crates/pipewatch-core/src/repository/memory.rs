//! In-memory execution repository.
//!
//! Backs the engine in tests and in embedded setups that do not need
//! durability across restarts. Enforces the same version rule as the SQLite
//! repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use pipewatch_types::error::RepositoryError;
use pipewatch_types::execution::{Execution, ExecutionFilter, ExecutionStatus, StatusCounts};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::execution::ExecutionRepository;

#[derive(Default)]
pub struct InMemoryExecutionRepository {
    documents: RwLock<HashMap<Uuid, Execution>>,
    fail_writes: AtomicBool,
}

impl InMemoryExecutionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `upsert` fail with a query error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store a snapshot verbatim, bypassing the version check.
    pub async fn insert_raw(&self, execution: Execution) {
        self.documents.write().await.insert(execution.id, execution);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl ExecutionRepository for InMemoryExecutionRepository {
    async fn upsert(&self, execution: &Execution) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("write rejected".to_string()));
        }

        let mut documents = self.documents.write().await;
        if let Some(stored) = documents.get(&execution.id) {
            if execution.version <= stored.version {
                return Err(RepositoryError::Conflict(format!(
                    "execution {} is at version {}, write carries {}",
                    execution.id, stored.version, execution.version
                )));
            }
        }
        documents.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn find_one(&self, id: &Uuid) -> Result<Option<Execution>, RepositoryError> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn find(&self, filter: &ExecutionFilter) -> Result<Vec<Execution>, RepositoryError> {
        let documents = self.documents.read().await;
        let mut matches: Vec<Execution> = documents
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        matches.truncate(filter.limit as usize);
        Ok(matches)
    }

    async fn count_by_status(&self) -> Result<StatusCounts, RepositoryError> {
        let documents = self.documents.read().await;
        let mut counts = StatusCounts::default();
        for execution in documents.values() {
            counts.add(execution.status);
        }
        Ok(counts)
    }

    async fn list_running(&self) -> Result<Vec<Execution>, RepositoryError> {
        let documents = self.documents.read().await;
        let mut running: Vec<Execution> = documents
            .values()
            .filter(|e| e.status == ExecutionStatus::Running)
            .cloned()
            .collect();
        running.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewatch_types::execution::ValueMap;

    fn execution(workflow_id: &str) -> Execution {
        let mut e = Execution::new(workflow_id, ValueMap::new());
        e.version = 1;
        e
    }

    #[tokio::test]
    async fn upsert_then_find_one() {
        let repo = InMemoryExecutionRepository::new();
        let e = execution("wf1");
        repo.upsert(&e).await.unwrap();

        let loaded = repo.find_one(&e.id).await.unwrap().unwrap();
        assert_eq!(loaded, e);
        assert!(repo.find_one(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_rejects_non_increasing_version() {
        let repo = InMemoryExecutionRepository::new();
        let mut e = execution("wf1");
        repo.upsert(&e).await.unwrap();

        let err = repo.upsert(&e).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        e.version = 2;
        repo.upsert(&e).await.unwrap();
        assert_eq!(repo.find_one(&e.id).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn find_filters_sorts_and_limits() {
        let repo = InMemoryExecutionRepository::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let e = execution("wf1");
            ids.push(e.id);
            repo.upsert(&e).await.unwrap();
        }
        repo.upsert(&execution("wf2")).await.unwrap();

        let found = repo
            .find(&ExecutionFilter::for_workflow("wf1", 2))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.workflow_id == "wf1"));
        // Newest first; v7 ids are time ordered as a tie-breaker.
        assert_eq!(found[0].id, ids[2]);
        assert_eq!(found[1].id, ids[1]);
    }

    #[tokio::test]
    async fn count_and_list_running() {
        let repo = InMemoryExecutionRepository::new();
        let running = execution("wf1");
        let mut done = execution("wf1");
        done.complete();
        repo.upsert(&running).await.unwrap();
        repo.upsert(&done).await.unwrap();

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts.running, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.total(), 2);

        let listed = repo.list_running().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, running.id);
    }

    #[tokio::test]
    async fn fail_writes_rejects_upserts() {
        let repo = InMemoryExecutionRepository::new();
        repo.set_fail_writes(true);
        let err = repo.upsert(&execution("wf1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));
        assert!(repo.is_empty().await);
    }
}

//! Application state wiring the engine to its infrastructure.
//!
//! AppState holds the concrete engine used by both the CLI and the REST API.
//! The engine is generic over its execution repository, and AppState pins it
//! to the SQLite implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use pipewatch_core::workflow::definition::{discover_workflows, save_workflow_file};
use pipewatch_core::workflow::engine::{EngineError, WorkflowEngine};
use pipewatch_infra::agent::builtin_agents;
use pipewatch_infra::config::load_engine_config;
use pipewatch_infra::filesystem::{
    ensure_layout, resolve_data_dir, workflow_file_path, workflows_dir,
};
use pipewatch_infra::sqlite::execution::SqliteExecutionRepository;
use pipewatch_infra::sqlite::pool::DatabasePool;
use pipewatch_types::config::EngineConfig;
use pipewatch_types::workflow::WorkflowDefinition;

/// The engine pinned to the SQLite execution store.
pub type Engine = WorkflowEngine<SqliteExecutionRepository>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Arc<EngineConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize from the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        Self::init_in(resolve_data_dir()).await
    }

    /// Load config, open the store, build agents and register every workflow
    /// found under `{data_dir}/workflows`.
    pub async fn init_in(data_dir: PathBuf) -> anyhow::Result<Self> {
        ensure_layout(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_engine_config(&data_dir).await;

        let db_pool = DatabasePool::open_in(&data_dir)
            .await
            .context("failed to open execution database")?;

        let agents = builtin_agents(&config.agents).context("failed to build HTTP client")?;
        let engine = WorkflowEngine::with_settings(
            agents,
            SqliteExecutionRepository::new(db_pool.clone()),
            &config.engine,
        );

        let registered = register_discovered(&engine, &workflows_dir(&data_dir)).await?;
        tracing::debug!(
            data_dir = %data_dir.display(),
            workflows = registered,
            "application state initialized"
        );

        Ok(Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }

    /// Register a definition and save it under `workflows/`, so executions of
    /// it can still be resumed after a restart.
    ///
    /// A failed save is logged; the in-memory registration stands.
    pub async fn register_and_save(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<Arc<WorkflowDefinition>, EngineError> {
        let stored = self.engine.register(definition)?;
        let path = workflow_file_path(&self.data_dir, &stored.id);

        let def = Arc::clone(&stored);
        let target = path.clone();
        match tokio::task::spawn_blocking(move || save_workflow_file(&target, &def)).await {
            Ok(Ok(())) => {
                tracing::debug!(workflow_id = %stored.id, path = %path.display(), "saved workflow");
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    workflow_id = %stored.id,
                    path = %path.display(),
                    error = %e,
                    "failed to save workflow"
                );
            }
            Err(e) => {
                tracing::warn!(workflow_id = %stored.id, error = %e, "workflow save task failed");
            }
        }
        Ok(stored)
    }
}

/// Register every definition under `dir`. Invalid definitions are skipped.
async fn register_discovered(engine: &Engine, dir: &Path) -> anyhow::Result<usize> {
    let dir = dir.to_path_buf();
    let found = tokio::task::spawn_blocking(move || discover_workflows(&dir))
        .await
        .context("workflow discovery task failed")??;

    let mut registered = 0;
    for (path, definition) in found {
        match engine.register(definition) {
            Ok(_) => registered += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping invalid workflow");
            }
        }
    }
    Ok(registered)
}

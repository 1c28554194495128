//! Workflow engine: registration, sequential execution, checkpointing, resume.
//!
//! # Execution flow
//!
//! 1. Look up the definition and allocate a running `Execution`.
//! 2. Enter the active set and checkpoint.
//! 3. For each step from the execution's cursor:
//!    condition -> resolve input -> look up agent -> dispatch -> record ->
//!    bind output -> checkpoint. A failed step halts the run unless it is
//!    marked `continue_on_error`.
//! 4. Mark the execution completed or failed, checkpoint, leave the active set.
//!
//! `resume` reloads a running snapshot and re-enters step 3 at its cursor.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pipewatch_types::config::EngineSettings;
use pipewatch_types::error::RepositoryError;
use pipewatch_types::event::WorkflowEvent;
use pipewatch_types::execution::{
    EngineStats, Execution, ExecutionFilter, ExecutionStatus, StepRecord, StepStatus, ValueMap,
};
use pipewatch_types::workflow::{StepDefinition, WorkflowDefinition};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::agent::registry::AgentRegistry;
use crate::event::bus::EventBus;
use crate::repository::execution::ExecutionRepository;

use super::checkpoint::{CheckpointManager, CheckpointOutcome};
use super::condition::ConditionEvaluator;
use super::definition::WorkflowError;
use super::registry::WorkflowRegistry;
use super::template::{self, Bindings};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced to callers of the engine.
///
/// Step failures are not in here: they are recorded on the execution.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Definition(#[from] WorkflowError),

    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("agent '{agent}' not found (execution {execution_id})")]
    AgentNotFound { agent: String, execution_id: Uuid },

    #[error("execution {0} not found")]
    ExecutionNotFound(Uuid),

    #[error("execution {execution_id} is {status}; only running executions can be resumed")]
    InvalidState {
        execution_id: Uuid,
        status: ExecutionStatus,
    },

    #[error("execution {0} is already active in this engine")]
    AlreadyActive(Uuid),

    #[error("execution {0} was checkpointed by another runner")]
    StaleCheckpoint(Uuid),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Coarse error classes, for mapping onto exit codes and HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidState,
    Persistence,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Definition(_) => ErrorKind::Validation,
            EngineError::WorkflowNotFound(_)
            | EngineError::AgentNotFound { .. }
            | EngineError::ExecutionNotFound(_) => ErrorKind::NotFound,
            EngineError::InvalidState { .. }
            | EngineError::AlreadyActive(_)
            | EngineError::StaleCheckpoint(_) => ErrorKind::InvalidState,
            EngineError::Repository(_) => ErrorKind::Persistence,
        }
    }
}

// ---------------------------------------------------------------------------
// Active set
// ---------------------------------------------------------------------------

/// An execution currently being driven by this engine.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveExecution {
    pub execution_id: Uuid,
    pub workflow_id: String,
    pub started_at: DateTime<Utc>,
    pub resumed: bool,
}

/// Removes its execution from the active set when dropped, including when the
/// driving future is cancelled.
struct ActiveGuard<'a> {
    active: &'a DashMap<Uuid, ActiveExecution>,
    execution_id: Uuid,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.execution_id);
    }
}

/// Why the step loop stopped early.
enum Halt {
    StepFailed { step_id: String, error: String },
    AgentNotFound { step_id: String, agent: String },
    Stale,
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Runs registered workflows against an agent registry, checkpointing every
/// state change to an [`ExecutionRepository`].
pub struct WorkflowEngine<R: ExecutionRepository> {
    registry: WorkflowRegistry,
    agents: AgentRegistry,
    checkpoints: CheckpointManager<R>,
    conditions: ConditionEvaluator,
    event_bus: EventBus,
    active: DashMap<Uuid, ActiveExecution>,
    default_list_limit: u32,
}

impl<R: ExecutionRepository> WorkflowEngine<R> {
    /// Create an engine with default settings.
    pub fn new(agents: AgentRegistry, repo: R) -> Self {
        Self::with_settings(agents, repo, &EngineSettings::default())
    }

    pub fn with_settings(agents: AgentRegistry, repo: R, settings: &EngineSettings) -> Self {
        Self {
            registry: WorkflowRegistry::new(),
            agents,
            checkpoints: CheckpointManager::new(repo),
            conditions: ConditionEvaluator::new(settings.condition_scope),
            event_bus: EventBus::new(settings.event_capacity),
            active: DashMap::new(),
            default_list_limit: settings.default_list_limit,
        }
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Validate and register a workflow definition, replacing any previous
    /// definition with the same id.
    pub fn register(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<Arc<WorkflowDefinition>, EngineError> {
        Ok(self.registry.register(definition)?)
    }

    pub fn workflow(&self, workflow_id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.registry.get(workflow_id)
    }

    pub fn workflows(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.registry.list()
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn repo(&self) -> &R {
        self.checkpoints.repo()
    }

    /// Subscribe to execution events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.event_bus.subscribe()
    }

    // -----------------------------------------------------------------------
    // Execute / resume
    // -----------------------------------------------------------------------

    /// Run a registered workflow from its first step.
    ///
    /// A step failure that halts the run is not an `Err`: the returned
    /// execution has `status == Failed` and its `error` names the step.
    #[tracing::instrument(name = "execute", skip(self, context))]
    pub async fn execute(
        &self,
        workflow_id: &str,
        context: ValueMap,
    ) -> Result<Execution, EngineError> {
        let definition = self
            .registry
            .get(workflow_id)
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))?;

        let mut execution = Execution::new(&definition.id, context);
        let _guard = self.activate(&execution, false)?;

        tracing::info!(
            execution_id = %execution.id,
            steps = definition.steps.len(),
            "starting execution"
        );

        let outcome = match self.checkpoint(&mut execution).await {
            Ok(()) => {
                self.event_bus.publish(WorkflowEvent::ExecutionStarted {
                    execution_id: execution.id,
                    workflow_id: definition.id.clone(),
                    total_steps: definition.steps.len(),
                });
                self.run_steps(&definition, &mut execution).await
            }
            Err(halt) => Err(halt),
        };

        self.finalize(execution, outcome).await
    }

    /// Continue a persisted running execution from its cursor.
    #[tracing::instrument(name = "resume", skip(self))]
    pub async fn resume(&self, execution_id: Uuid) -> Result<Execution, EngineError> {
        let mut execution = self
            .checkpoints
            .load(&execution_id)
            .await?
            .ok_or(EngineError::ExecutionNotFound(execution_id))?;

        if execution.status != ExecutionStatus::Running {
            return Err(EngineError::InvalidState {
                execution_id,
                status: execution.status,
            });
        }

        let _guard = self.activate(&execution, true)?;

        let definition = self
            .registry
            .get(&execution.workflow_id)
            .ok_or_else(|| EngineError::WorkflowNotFound(execution.workflow_id.clone()))?;

        // Claim the snapshot before running anything.
        if self.checkpoint(&mut execution).await.is_err() {
            return Err(EngineError::StaleCheckpoint(execution_id));
        }

        let from_step = execution.resume_index();
        tracing::info!(
            execution_id = %execution_id,
            workflow_id = %definition.id,
            from_step,
            remaining = definition.steps.len().saturating_sub(from_step),
            "resuming execution"
        );
        self.event_bus.publish(WorkflowEvent::ExecutionResumed {
            execution_id,
            workflow_id: definition.id.clone(),
            from_step,
        });

        let outcome = match halted_by_failure(&definition, &execution) {
            Some(halt) => {
                tracing::warn!(
                    execution_id = %execution_id,
                    "last recorded step failed, finishing without running further steps"
                );
                Err(halt)
            }
            None => self.run_steps(&definition, &mut execution).await,
        };
        self.finalize(execution, outcome).await
    }

    /// Resume every persisted execution still marked running.
    ///
    /// Executions already active in this engine are left alone. Individual
    /// failures are logged and reported in the result; they do not stop the
    /// sweep.
    pub async fn recover_running(
        &self,
    ) -> Result<Vec<(Uuid, Result<Execution, EngineError>)>, EngineError> {
        let running = self.checkpoints.repo().list_running().await?;
        let mut results = Vec::with_capacity(running.len());

        for execution in running {
            if self.active.contains_key(&execution.id) {
                continue;
            }
            let result = self.resume(execution.id).await;
            if let Err(e) = &result {
                tracing::warn!(execution_id = %execution.id, error = %e, "recovery failed");
            }
            results.push((execution.id, result));
        }

        tracing::info!(recovered = results.len(), "recovery sweep finished");
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn get_execution(&self, execution_id: Uuid) -> Result<Execution, EngineError> {
        self.checkpoints
            .load(&execution_id)
            .await?
            .ok_or(EngineError::ExecutionNotFound(execution_id))
    }

    /// Newest executions first, optionally for one workflow.
    pub async fn list_executions(
        &self,
        workflow_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Execution>, EngineError> {
        let filter = ExecutionFilter {
            workflow_id: workflow_id.map(str::to_string),
            status: None,
            limit: limit.unwrap_or(self.default_list_limit),
        };
        self.find_executions(&filter).await
    }

    pub async fn find_executions(
        &self,
        filter: &ExecutionFilter,
    ) -> Result<Vec<Execution>, EngineError> {
        Ok(self.checkpoints.repo().find(filter).await?)
    }

    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        let counts = self.checkpoints.repo().count_by_status().await?;
        Ok(EngineStats {
            registered_workflows: self.registry.len(),
            active_executions: self.active.len(),
            total_executions: counts.total(),
            running: counts.running,
            completed: counts.completed,
            failed: counts.failed,
        })
    }

    pub fn active_executions(&self) -> Vec<ActiveExecution> {
        let mut active: Vec<ActiveExecution> =
            self.active.iter().map(|entry| entry.value().clone()).collect();
        active.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        active
    }

    pub fn is_active(&self, execution_id: &Uuid) -> bool {
        self.active.contains_key(execution_id)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn activate(
        &self,
        execution: &Execution,
        resumed: bool,
    ) -> Result<ActiveGuard<'_>, EngineError> {
        match self.active.entry(execution.id) {
            Entry::Occupied(_) => Err(EngineError::AlreadyActive(execution.id)),
            Entry::Vacant(slot) => {
                slot.insert(ActiveExecution {
                    execution_id: execution.id,
                    workflow_id: execution.workflow_id.clone(),
                    started_at: Utc::now(),
                    resumed,
                });
                Ok(ActiveGuard {
                    active: &self.active,
                    execution_id: execution.id,
                })
            }
        }
    }

    async fn checkpoint(&self, execution: &mut Execution) -> Result<(), Halt> {
        match self.checkpoints.save(execution).await {
            CheckpointOutcome::Stale => Err(Halt::Stale),
            CheckpointOutcome::Saved | CheckpointOutcome::Swallowed => Ok(()),
        }
    }

    async fn run_steps(
        &self,
        definition: &WorkflowDefinition,
        execution: &mut Execution,
    ) -> Result<(), Halt> {
        let start = execution.resume_index();

        for (index, step) in definition.steps.iter().enumerate().skip(start) {
            if let Some(condition) = &step.condition {
                if !self
                    .conditions
                    .evaluate(condition, &execution.outputs, &execution.context)
                {
                    tracing::debug!(
                        execution_id = %execution.id,
                        step_id = %step.id,
                        condition,
                        "condition false, skipping step"
                    );
                    execution.cursor = index + 1;
                    self.checkpoint(execution).await?;
                    self.event_bus.publish(WorkflowEvent::StepSkipped {
                        execution_id: execution.id,
                        step_id: step.id.clone(),
                    });
                    continue;
                }
            }

            let started = Instant::now();
            let result = self.run_step(step, execution).await?;
            let failed = result.is_err();

            match result {
                Ok(value) => {
                    if let Some(name) = &step.output {
                        execution.outputs.insert(name.clone(), value.clone());
                    }
                    execution.steps.push(StepRecord::completed(&step.id, value));
                }
                Err(error) => {
                    tracing::warn!(
                        execution_id = %execution.id,
                        step_id = %step.id,
                        agent = %step.agent,
                        action = %step.action,
                        error = %error,
                        continue_on_error = step.continue_on_error,
                        "step failed"
                    );
                    execution.steps.push(StepRecord::failed(&step.id, error));
                }
            }
            execution.cursor = index + 1;
            self.checkpoint(execution).await?;

            if failed {
                let error = execution
                    .steps
                    .last()
                    .and_then(|r| r.error.clone())
                    .unwrap_or_default();
                self.event_bus.publish(WorkflowEvent::StepFailed {
                    execution_id: execution.id,
                    step_id: step.id.clone(),
                    error: error.clone(),
                    continued: step.continue_on_error,
                });
                if !step.continue_on_error {
                    return Err(Halt::StepFailed {
                        step_id: step.id.clone(),
                        error,
                    });
                }
            } else {
                self.event_bus.publish(WorkflowEvent::StepCompleted {
                    execution_id: execution.id,
                    step_id: step.id.clone(),
                    duration_ms: started.elapsed().as_millis() as u64,
                });
            }
        }

        Ok(())
    }

    /// Resolve the input and dispatch one step.
    ///
    /// The inner `Result` is the step outcome (recorded, never propagated).
    /// The outer one halts the run when the agent does not exist.
    async fn run_step(
        &self,
        step: &StepDefinition,
        execution: &Execution,
    ) -> Result<Result<serde_json::Value, String>, Halt> {
        let bindings = Bindings::new(&execution.outputs, &execution.context);
        let input = match template::resolve(&step.input, &bindings) {
            Ok(input) => input,
            Err(e) => return Ok(Err(e.to_string())),
        };

        let Some(agent) = self.agents.get(&step.agent) else {
            return Err(Halt::AgentNotFound {
                step_id: step.id.clone(),
                agent: step.agent.clone(),
            });
        };

        tracing::debug!(
            execution_id = %execution.id,
            step_id = %step.id,
            agent = %step.agent,
            action = %step.action,
            "dispatching step"
        );
        Ok(agent
            .dispatch(&step.action, input)
            .await
            .map_err(|e| e.to_string()))
    }

    async fn finalize(
        &self,
        mut execution: Execution,
        outcome: Result<(), Halt>,
    ) -> Result<Execution, EngineError> {
        let missing_agent = match outcome {
            Ok(()) => {
                execution.complete();
                None
            }
            Err(Halt::StepFailed { step_id, error }) => {
                execution.fail(format!("step '{step_id}' failed: {error}"));
                None
            }
            Err(Halt::AgentNotFound { step_id, agent }) => {
                execution.fail(format!("step '{step_id}' failed: agent '{agent}' not found"));
                Some(agent)
            }
            Err(Halt::Stale) => {
                tracing::warn!(
                    execution_id = %execution.id,
                    "abandoning execution, another runner owns it"
                );
                return Err(EngineError::StaleCheckpoint(execution.id));
            }
        };

        if self.checkpoint(&mut execution).await.is_err() {
            return Err(EngineError::StaleCheckpoint(execution.id));
        }

        let duration_ms = execution.duration_ms.unwrap_or_default();
        match &execution.error {
            None => {
                tracing::info!(
                    execution_id = %execution.id,
                    workflow_id = %execution.workflow_id,
                    duration_ms,
                    steps = execution.steps.len(),
                    "execution completed"
                );
                self.event_bus.publish(WorkflowEvent::ExecutionCompleted {
                    execution_id: execution.id,
                    workflow_id: execution.workflow_id.clone(),
                    duration_ms,
                });
            }
            Some(error) => {
                tracing::warn!(
                    execution_id = %execution.id,
                    workflow_id = %execution.workflow_id,
                    duration_ms,
                    error = %error,
                    "execution failed"
                );
                self.event_bus.publish(WorkflowEvent::ExecutionFailed {
                    execution_id: execution.id,
                    workflow_id: execution.workflow_id.clone(),
                    error: error.clone(),
                });
            }
        }

        match missing_agent {
            Some(agent) => Err(EngineError::AgentNotFound {
                agent,
                execution_id: execution.id,
            }),
            None => Ok(execution),
        }
    }
}

/// A snapshot whose last record is a failure that should have stopped the run
/// was checkpointed before its terminal write. Resume finishes it as failed.
fn halted_by_failure(definition: &WorkflowDefinition, execution: &Execution) -> Option<Halt> {
    let record = execution.steps.last()?;
    if record.status != StepStatus::Failed {
        return None;
    }
    let continues = definition
        .step(&record.id)
        .is_some_and(|step| step.continue_on_error);
    if continues {
        return None;
    }
    Some(Halt::StepFailed {
        step_id: record.id.clone(),
        error: record.error.clone().unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

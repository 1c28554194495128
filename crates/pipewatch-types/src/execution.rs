//! Execution tracking types.
//!
//! An `Execution` is one run of a workflow definition against a starting
//! context. The full snapshot is what gets checkpointed after every step, so
//! everything needed to resume a crashed run lives on this struct.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key/value bag used for both the caller context and bound step outputs.
pub type ValueMap = Map<String, Value>;

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// One run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// UUIDv7, unique per run.
    pub id: Uuid,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration in milliseconds, set when the run finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Caller-supplied starting context. Never mutated by the engine.
    #[serde(default)]
    pub context: ValueMap,
    /// Step results keyed by the step's `output` name. Append-only.
    #[serde(default)]
    pub outputs: ValueMap,
    /// One record per attempted step. Skipped steps leave no record.
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of definition steps attempted or skipped so far.
    #[serde(default)]
    pub cursor: usize,
    /// Checkpoint stamp. Every persisted write carries a strictly larger value.
    #[serde(default)]
    pub version: u64,
}

impl Execution {
    /// Allocate a fresh running execution.
    pub fn new(workflow_id: impl Into<String>, context: ValueMap) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            context,
            outputs: ValueMap::new(),
            steps: Vec::new(),
            error: None,
            cursor: 0,
            version: 0,
        }
    }

    /// Index of the first definition step that has not been attempted.
    ///
    /// Documents written without a cursor fall back to the record count.
    pub fn resume_index(&self) -> usize {
        self.cursor.max(self.steps.len())
    }

    /// Mark the run completed and stamp its end time.
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.finish();
    }

    /// Mark the run failed with the given message and stamp its end time.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.into());
        self.finish();
    }

    fn finish(&mut self) {
        let now = Utc::now();
        let elapsed = (now - self.start_time).num_milliseconds().max(0);
        self.end_time = Some(now);
        self.duration_ms = Some(elapsed as u64);
    }
}

/// Overall status of an execution.
///
/// `Running` moves to exactly one of the terminal states and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("invalid execution status: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Step records
// ---------------------------------------------------------------------------

/// Outcome of one attempted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// The step definition's id.
    pub id: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StepRecord {
    pub fn completed(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            status: StepStatus::Completed,
            result: Some(result),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: StepStatus::Failed,
            result: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// Queries and stats
// ---------------------------------------------------------------------------

/// Filter for execution listings. Results are always newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

impl Default for ExecutionFilter {
    fn default() -> Self {
        Self {
            workflow_id: None,
            status: None,
            limit: default_limit(),
        }
    }
}

impl ExecutionFilter {
    pub fn for_workflow(workflow_id: impl Into<String>, limit: u32) -> Self {
        Self {
            workflow_id: Some(workflow_id.into()),
            status: None,
            limit,
        }
    }

    /// Whether an execution passes the workflow/status predicates.
    pub fn matches(&self, execution: &Execution) -> bool {
        self.workflow_id
            .as_deref()
            .is_none_or(|id| execution.workflow_id == id)
            && self.status.is_none_or(|s| execution.status == s)
    }
}

/// Persisted execution counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.running + self.completed + self.failed
    }

    pub fn add(&mut self, status: ExecutionStatus) {
        match status {
            ExecutionStatus::Running => self.running += 1,
            ExecutionStatus::Completed => self.completed += 1,
            ExecutionStatus::Failed => self.failed += 1,
        }
    }
}

/// Engine-wide statistics for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub registered_workflows: usize,
    /// Executions currently running inside this process.
    pub active_executions: usize,
    pub total_executions: u64,
    /// Persisted executions still marked running (includes crashed runs).
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

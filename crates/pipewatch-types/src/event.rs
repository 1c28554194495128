//! Event types for the execution event bus.
//!
//! `WorkflowEvent` is broadcast on every execution state transition. All
//! variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted while executions run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A new execution was allocated and checkpointed.
    ExecutionStarted {
        execution_id: Uuid,
        workflow_id: String,
        total_steps: usize,
    },

    /// A persisted running execution was picked up again.
    ExecutionResumed {
        execution_id: Uuid,
        workflow_id: String,
        /// Index of the first step that will run.
        from_step: usize,
    },

    /// A step's condition evaluated false.
    StepSkipped { execution_id: Uuid, step_id: String },

    StepCompleted {
        execution_id: Uuid,
        step_id: String,
        duration_ms: u64,
    },

    StepFailed {
        execution_id: Uuid,
        step_id: String,
        error: String,
        /// Whether the workflow keeps going (`continue_on_error`).
        continued: bool,
    },

    ExecutionCompleted {
        execution_id: Uuid,
        workflow_id: String,
        duration_ms: u64,
    },

    ExecutionFailed {
        execution_id: Uuid,
        workflow_id: String,
        error: String,
    },
}

impl WorkflowEvent {
    /// The execution this event belongs to.
    pub fn execution_id(&self) -> Uuid {
        match self {
            WorkflowEvent::ExecutionStarted { execution_id, .. }
            | WorkflowEvent::ExecutionResumed { execution_id, .. }
            | WorkflowEvent::StepSkipped { execution_id, .. }
            | WorkflowEvent::StepCompleted { execution_id, .. }
            | WorkflowEvent::StepFailed { execution_id, .. }
            | WorkflowEvent::ExecutionCompleted { execution_id, .. }
            | WorkflowEvent::ExecutionFailed { execution_id, .. } => *execution_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let id = Uuid::now_v7();
        let event = WorkflowEvent::StepSkipped {
            execution_id: id,
            step_id: "s2".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "step_skipped");
        assert_eq!(value["step_id"], "s2");

        let parsed: WorkflowEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.execution_id(), id);
    }
}

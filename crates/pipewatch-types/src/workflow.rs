//! Workflow definition types.
//!
//! A `WorkflowDefinition` is pure data: an ordered list of steps plus opaque
//! trigger metadata. Definitions arrive as YAML/JSON documents or over the REST
//! API and are stamped with `registered_at` when the engine accepts them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A declarative multi-step procedure.
///
/// Steps run strictly in order. There is no dependency graph: a later step sees
/// the outputs bound by every earlier step that actually ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow identifier (e.g. `build-failure-triage`).
    pub id: String,
    /// Human-readable name. Defaults to the id when omitted.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Trigger metadata. Interpreted by whatever dispatcher calls the engine,
    /// never by the engine itself.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub trigger: Value,
    /// Ordered list of steps.
    pub steps: Vec<StepDefinition>,
    /// Set by the registry on registration.
    #[serde(
        default,
        alias = "registeredAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub registered_at: Option<DateTime<Utc>>,
}

impl WorkflowDefinition {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == step_id)
    }
}

/// One unit of work: an agent action invoked with a (possibly templated) input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step identifier, unique within the workflow.
    pub id: String,
    /// Agent registry key.
    pub agent: String,
    /// Action name dispatched on the agent.
    pub action: String,
    /// Literal value or `${name}` template string. Only top-level strings are
    /// resolved; objects and arrays pass through untouched.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub input: Value,
    /// Name under which a successful result is bound in the execution outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Template gating whether the step runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Keep going after this step fails.
    #[serde(default, alias = "continueOnError")]
    pub continue_on_error: bool,
}

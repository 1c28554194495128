//! In-memory workflow registry.
//!
//! Maps workflow id to its validated, timestamped definition. Registering an
//! id that already exists replaces the previous definition; executions that
//! already hold the old `Arc` keep running against it.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use pipewatch_types::workflow::WorkflowDefinition;

use super::definition::{validate_definition, WorkflowError};

#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: DashMap<String, Arc<WorkflowDefinition>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, stamp `registered_at`, and store a definition.
    pub fn register(
        &self,
        mut definition: WorkflowDefinition,
    ) -> Result<Arc<WorkflowDefinition>, WorkflowError> {
        validate_definition(&definition)?;
        definition.registered_at = Some(Utc::now());

        let definition = Arc::new(definition);
        let replaced = self
            .workflows
            .insert(definition.id.clone(), Arc::clone(&definition))
            .is_some();

        tracing::info!(
            workflow_id = %definition.id,
            steps = definition.steps.len(),
            replaced,
            "registered workflow"
        );
        Ok(definition)
    }

    pub fn get(&self, workflow_id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.get(workflow_id).map(|entry| Arc::clone(entry.value()))
    }

    /// All registered definitions, sorted by id.
    pub fn list(&self) -> Vec<Arc<WorkflowDefinition>> {
        let mut all: Vec<Arc<WorkflowDefinition>> = self
            .workflows
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewatch_types::workflow::StepDefinition;
    use serde_json::{json, Value};

    fn definition(id: &str, steps: usize) -> WorkflowDefinition {
        WorkflowDefinition {
            id: id.to_string(),
            name: String::new(),
            description: None,
            trigger: Value::Null,
            steps: (0..steps)
                .map(|i| StepDefinition {
                    id: format!("s{}", i + 1),
                    agent: "echo".to_string(),
                    action: "run".to_string(),
                    input: json!(i),
                    output: None,
                    condition: None,
                    continue_on_error: false,
                })
                .collect(),
            registered_at: None,
        }
    }

    #[test]
    fn register_stamps_timestamp() {
        let registry = WorkflowRegistry::new();
        let stored = registry.register(definition("wf1", 1)).unwrap();
        assert!(stored.registered_at.is_some());
        assert_eq!(registry.get("wf1").unwrap().steps.len(), 1);
    }

    #[test]
    fn register_overwrites_same_id() {
        let registry = WorkflowRegistry::new();
        let first = registry.register(definition("wf1", 1)).unwrap();
        registry.register(definition("wf1", 3)).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("wf1").unwrap().steps.len(), 3);
        // Holders of the old definition are unaffected.
        assert_eq!(first.steps.len(), 1);
    }

    #[test]
    fn register_rejects_blank_id() {
        let registry = WorkflowRegistry::new();
        let err = registry.register(definition("", 1)).unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationError(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn list_is_sorted_by_id() {
        let registry = WorkflowRegistry::new();
        registry.register(definition("sprint-monitor", 1)).unwrap();
        registry.register(definition("build-failure", 1)).unwrap();

        let ids: Vec<String> = registry.list().iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec!["build-failure", "sprint-monitor"]);
        assert!(registry.get("missing").is_none());
    }
}

//! Workflow definition parsing, validation, and filesystem operations.
//!
//! Definitions are read from YAML or JSON documents, checked for structural
//! problems, and discovered recursively under a workflows directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pipewatch_types::workflow::WorkflowDefinition;
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or registering definitions.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// YAML/JSON parse failure.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Structural validation failure.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a YAML string into a validated `WorkflowDefinition`.
pub fn parse_workflow_yaml(yaml: &str) -> Result<WorkflowDefinition, WorkflowError> {
    let raw: Value =
        serde_yaml_ng::from_str(yaml).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    parse_workflow_value(raw)
}

/// Parse a JSON string into a validated `WorkflowDefinition`.
pub fn parse_workflow_json(json: &str) -> Result<WorkflowDefinition, WorkflowError> {
    let raw: Value =
        serde_json::from_str(json).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    parse_workflow_value(raw)
}

/// Convert a raw document into a validated `WorkflowDefinition`.
///
/// A document without an `id` or `steps` key is a validation error rather
/// than a parse error.
pub fn parse_workflow_value(raw: Value) -> Result<WorkflowDefinition, WorkflowError> {
    let Some(doc) = raw.as_object() else {
        return Err(WorkflowError::ValidationError(
            "workflow definition must be an object".to_string(),
        ));
    };
    for key in ["id", "steps"] {
        if doc.get(key).is_none_or(Value::is_null) {
            return Err(WorkflowError::ValidationError(format!(
                "workflow definition is missing '{key}'"
            )));
        }
    }

    let def: WorkflowDefinition =
        serde_json::from_value(raw).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    validate_definition(&def)?;
    Ok(def)
}

/// Serialize a `WorkflowDefinition` to a YAML string.
pub fn serialize_workflow_yaml(def: &WorkflowDefinition) -> Result<String, WorkflowError> {
    serde_yaml_ng::to_string(def).map_err(|e| WorkflowError::ParseError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints on a `WorkflowDefinition`.
///
/// Checks:
/// - The id is not blank
/// - Every step has a non-blank id, agent and action
/// - Step ids are unique
///
/// An empty step list is allowed; such a workflow completes immediately.
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if def.id.trim().is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow id must not be empty".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for (index, step) in def.steps.iter().enumerate() {
        for (field, value) in [
            ("id", &step.id),
            ("agent", &step.agent),
            ("action", &step.action),
        ] {
            if value.trim().is_empty() {
                return Err(WorkflowError::ValidationError(format!(
                    "step #{} in '{}' has an empty {field}",
                    index + 1,
                    def.id
                )));
            }
        }

        if !seen_ids.insert(step.id.as_str()) {
            return Err(WorkflowError::ValidationError(format!(
                "duplicate step ID: '{}'",
                step.id
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

/// Load a workflow definition file. `.json` files are read as JSON, anything
/// else as YAML.
pub fn load_workflow_file(path: &Path) -> Result<WorkflowDefinition, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    if is_json(path) {
        parse_workflow_json(&content)
    } else {
        parse_workflow_yaml(&content)
    }
}

/// Save a workflow definition to a YAML file.
///
/// Creates parent directories if they don't exist.
pub fn save_workflow_file(path: &Path, def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serialize_workflow_yaml(def)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Discover all workflow files under `base_dir`, sorted by path.
///
/// Scans recursively for `.yaml`, `.yml` and `.json` files. Files that fail
/// to parse or validate are logged and skipped.
pub fn discover_workflows(
    base_dir: &Path,
) -> Result<Vec<(PathBuf, WorkflowDefinition)>, WorkflowError> {
    let mut results = Vec::new();
    if !base_dir.exists() {
        return Ok(results);
    }
    discover_recursive(base_dir, &mut results)?;
    results.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(results)
}

fn discover_recursive(
    dir: &Path,
    results: &mut Vec<(PathBuf, WorkflowDefinition)>,
) -> Result<(), WorkflowError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            discover_recursive(&path, results)?;
        } else if is_definition_file(&path) {
            match load_workflow_file(&path) {
                Ok(def) => results.push((path, def)),
                Err(e) => {
                    tracing::warn!(?path, error = %e, "skipping unparseable workflow file");
                }
            }
        }
    }
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn is_definition_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

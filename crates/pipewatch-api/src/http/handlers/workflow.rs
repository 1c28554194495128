//! Workflow registration and execution handlers.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use pipewatch_core::workflow::definition::parse_workflow_value;
use pipewatch_core::workflow::engine::EngineError;
use pipewatch_types::execution::{Execution, ValueMap};
use pipewatch_types::workflow::WorkflowDefinition;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Listing row for a registered workflow.
#[derive(Debug, Serialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
}

impl From<&WorkflowDefinition> for WorkflowSummary {
    fn from(def: &WorkflowDefinition) -> Self {
        Self {
            id: def.id.clone(),
            name: def.display_name().to_string(),
            description: def.description.clone(),
            steps: def.steps.len(),
            registered_at: def.registered_at,
        }
    }
}

/// GET /api/v1/workflows - List registered workflows.
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<WorkflowSummary>>, AppError> {
    let start = Instant::now();
    let summaries = state
        .engine
        .workflows()
        .iter()
        .map(|def| WorkflowSummary::from(def.as_ref()))
        .collect();
    Ok(ApiResponse::success(summaries, start).with_link("self", "/api/v1/workflows"))
}

/// POST /api/v1/workflows - Register (or replace) a workflow definition.
///
/// The definition is also saved under `workflows/` in the data directory.
pub async fn register_workflow(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ApiResponse<WorkflowDefinition>, AppError> {
    let start = Instant::now();
    let raw: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("invalid JSON body: {e}")))?;
    let definition = parse_workflow_value(raw)?;
    let stored = state.register_and_save(definition).await?;

    let self_link = format!("/api/v1/workflows/{}", stored.id);
    let execute_link = format!("{self_link}/execute");
    Ok(ApiResponse::success(stored.as_ref().clone(), start)
        .with_link("self", &self_link)
        .with_link("execute", &execute_link))
}

/// GET /api/v1/workflows/{id} - Full definition of one workflow.
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<WorkflowDefinition>, AppError> {
    let start = Instant::now();
    let def = state
        .engine
        .workflow(&id)
        .ok_or_else(|| EngineError::WorkflowNotFound(id.clone()))?;

    Ok(ApiResponse::success(def.as_ref().clone(), start)
        .with_link("self", &format!("/api/v1/workflows/{id}"))
        .with_link("executions", &format!("/api/v1/executions?workflow_id={id}")))
}

/// POST /api/v1/workflows/{id}/execute - Run a workflow to completion.
///
/// The optional body is a JSON object used as the execution context. The
/// response carries the finished execution, including failed ones.
pub async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<Execution>, AppError> {
    let start = Instant::now();
    let context = parse_context(&body)?;
    let execution = state.engine.execute(&id, context).await?;

    let link = format!("/api/v1/executions/{}", execution.id);
    Ok(ApiResponse::success(execution, start).with_link("self", &link))
}

/// Empty body or `null` means an empty context; anything else must be an object.
fn parse_context(body: &[u8]) -> Result<ValueMap, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ValueMap::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(ValueMap::new()),
        Ok(_) => Err(AppError::Validation(
            "execution context must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::Validation(format!("invalid JSON body: {e}"))),
    }
}

//! Execution query and resume handlers.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use pipewatch_types::execution::{Execution, ExecutionFilter, ExecutionStatus};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for listing executions.
#[derive(Debug, Default, Deserialize)]
pub struct ListExecutionsQuery {
    pub workflow_id: Option<String>,
    /// `running`, `completed` or `failed`.
    pub status: Option<String>,
    pub limit: Option<u32>,
}

impl ListExecutionsQuery {
    fn into_filter(self, default_limit: u32) -> Result<ExecutionFilter, AppError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<ExecutionStatus>)
            .transpose()
            .map_err(AppError::Validation)?;
        Ok(ExecutionFilter {
            workflow_id: self.workflow_id,
            status,
            limit: self.limit.unwrap_or(default_limit),
        })
    }
}

/// GET /api/v1/executions - Newest executions first.
pub async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<ApiResponse<Vec<Execution>>, AppError> {
    let start = Instant::now();
    let filter = query.into_filter(state.config.engine.default_list_limit)?;
    let executions = state.engine.find_executions(&filter).await?;
    Ok(ApiResponse::success(executions, start).with_link("self", "/api/v1/executions"))
}

/// GET /api/v1/executions/{id}
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Execution>, AppError> {
    let start = Instant::now();
    let execution = state.engine.get_execution(id).await?;
    let workflow_link = format!("/api/v1/workflows/{}", execution.workflow_id);
    Ok(ApiResponse::success(execution, start)
        .with_link("self", &format!("/api/v1/executions/{id}"))
        .with_link("workflow", &workflow_link))
}

/// POST /api/v1/executions/{id}/resume - Continue a running execution.
pub async fn resume_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Execution>, AppError> {
    let start = Instant::now();
    let execution = state.engine.resume(id).await?;
    Ok(ApiResponse::success(execution, start)
        .with_link("self", &format!("/api/v1/executions/{id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_into_filter() {
        let filter = ListExecutionsQuery {
            workflow_id: Some("wf1".into()),
            status: Some("failed".into()),
            limit: None,
        }
        .into_filter(20)
        .unwrap();
        assert_eq!(filter.workflow_id.as_deref(), Some("wf1"));
        assert_eq!(filter.status, Some(ExecutionStatus::Failed));
        assert_eq!(filter.limit, 20);

        let err = ListExecutionsQuery {
            status: Some("paused".into()),
            ..ListExecutionsQuery::default()
        }
        .into_filter(20)
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

//! GET /api/v1/stats - Engine statistics for the dashboard.

use std::time::Instant;

use axum::extract::State;
use serde::Serialize;

use pipewatch_core::workflow::engine::ActiveExecution;
use pipewatch_types::execution::EngineStats;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: EngineStats,
    pub active: Vec<ActiveExecution>,
    pub agents: Vec<String>,
}

pub async fn get_stats(State(state): State<AppState>) -> Result<ApiResponse<StatsResponse>, AppError> {
    let start = Instant::now();
    let stats = state.engine.stats().await?;
    let response = StatsResponse {
        stats,
        active: state.engine.active_executions(),
        agents: state
            .engine
            .agents()
            .list_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };
    Ok(ApiResponse::success(response, start).with_link("self", "/api/v1/stats"))
}

//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use pipewatch_core::workflow::definition::WorkflowError;
use pipewatch_core::workflow::engine::{EngineError, ErrorKind};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors raised by the workflow engine.
    Engine(EngineError),
    /// Malformed request input.
    Validation(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        AppError::Engine(EngineError::Definition(e))
    }
}

impl AppError {
    /// HTTP status and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Engine(e) => match e {
                EngineError::WorkflowNotFound(_) => (StatusCode::NOT_FOUND, "WORKFLOW_NOT_FOUND"),
                EngineError::ExecutionNotFound(_) => (StatusCode::NOT_FOUND, "EXECUTION_NOT_FOUND"),
                EngineError::AgentNotFound { .. } => (StatusCode::NOT_FOUND, "AGENT_NOT_FOUND"),
                EngineError::AlreadyActive(_) => (StatusCode::CONFLICT, "ALREADY_ACTIVE"),
                EngineError::StaleCheckpoint(_) => (StatusCode::CONFLICT, "STALE_CHECKPOINT"),
                other => match other.kind() {
                    ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    ErrorKind::InvalidState => (StatusCode::CONFLICT, "INVALID_STATE"),
                    ErrorKind::Persistence => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR")
                    }
                },
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Engine(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }

        (status, ApiResponse::error(code, &message)).into_response()
    }
}

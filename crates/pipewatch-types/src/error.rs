use thiserror::Error;

/// Errors raised by agent actions.
///
/// These never escape a step on their own: the engine renders them into the
/// step's record and only escalates when the step is not allowed to fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("agent '{agent}' has no action '{action}'")]
    UnknownAction { agent: String, action: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),
}

/// Generic repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

//! Agent trait definition.
//!
//! An agent performs the real work behind a step: querying a build, sending a
//! notification, escalating an issue. The engine only ever calls
//! [`Agent::dispatch`] with an action name and the step's resolved input.

use pipewatch_types::error::AgentError;
use serde_json::Value;

/// Capability interface for step executors.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Wrap an
/// implementation in [`super::box_agent::BoxAgent`] to store it in the
/// [`super::registry::AgentRegistry`].
///
/// Implementations live in pipewatch-infra (e.g. `HttpAgent`) or are built
/// ad hoc with [`super::action::ActionAgent`].
pub trait Agent: Send + Sync {
    /// Registry-facing name (e.g. "http", "notify").
    fn name(&self) -> &str;

    /// Action names this agent understands, for listings and validation.
    fn actions(&self) -> Vec<String>;

    /// Run `action` with `input`.
    ///
    /// Unknown actions must fail with [`AgentError::UnknownAction`].
    fn dispatch(
        &self,
        action: &str,
        input: Value,
    ) -> impl std::future::Future<Output = Result<Value, AgentError>> + Send;
}

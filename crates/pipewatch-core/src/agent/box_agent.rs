//! BoxAgent -- object-safe dynamic dispatch wrapper for Agent.
//!
//! 1. `AgentDyn` is an object-safe mirror of `Agent` with boxed futures
//! 2. Blanket-impl `AgentDyn` for all `T: Agent`
//! 3. `BoxAgent` wraps `Box<dyn AgentDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use pipewatch_types::error::AgentError;
use serde_json::Value;

use super::dispatch::Agent;

/// Object-safe version of [`Agent`] with boxed futures.
pub trait AgentDyn: Send + Sync {
    fn name(&self) -> &str;

    fn actions(&self) -> Vec<String>;

    fn dispatch_boxed<'a>(
        &'a self,
        action: &'a str,
        input: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, AgentError>> + Send + 'a>>;
}

impl<T: Agent> AgentDyn for T {
    fn name(&self) -> &str {
        Agent::name(self)
    }

    fn actions(&self) -> Vec<String> {
        Agent::actions(self)
    }

    fn dispatch_boxed<'a>(
        &'a self,
        action: &'a str,
        input: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, AgentError>> + Send + 'a>> {
        Box::pin(self.dispatch(action, input))
    }
}

/// Type-erased agent for runtime lookup by name.
///
/// `Agent` uses RPITIT and so cannot be a trait object directly; `BoxAgent`
/// offers the same methods by delegating to an `AgentDyn` trait object.
pub struct BoxAgent {
    inner: Box<dyn AgentDyn>,
}

impl BoxAgent {
    /// Wrap a concrete `Agent` in a type-erased box.
    pub fn new<T: Agent + 'static>(agent: T) -> Self {
        Self {
            inner: Box::new(agent),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn actions(&self) -> Vec<String> {
        self.inner.actions()
    }

    /// Run an action on the wrapped agent.
    pub async fn dispatch(&self, action: &str, input: Value) -> Result<Value, AgentError> {
        self.inner.dispatch_boxed(action, input).await
    }
}

impl std::fmt::Debug for BoxAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxAgent")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    impl Agent for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn actions(&self) -> Vec<String> {
            vec!["shout".to_string()]
        }

        async fn dispatch(&self, action: &str, input: Value) -> Result<Value, AgentError> {
            match action {
                "shout" => Ok(json!(input.as_str().unwrap_or_default().to_uppercase())),
                other => Err(AgentError::UnknownAction {
                    agent: "upper".to_string(),
                    action: other.to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn box_agent_delegates_to_inner() {
        let agent = BoxAgent::new(Upper);
        assert_eq!(agent.name(), "upper");
        assert_eq!(agent.actions(), vec!["shout"]);

        let out = agent.dispatch("shout", json!("build failed")).await.unwrap();
        assert_eq!(out, json!("BUILD FAILED"));
    }

    #[tokio::test]
    async fn box_agent_surfaces_unknown_action() {
        let agent = BoxAgent::new(Upper);
        let err = agent.dispatch("whisper", json!("x")).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownAction { .. }));
        assert!(format!("{agent:?}").contains("upper"));
    }
}

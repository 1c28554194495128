//! Table-driven agent built from closures.
//!
//! `ActionAgent` maps action names to async handler functions. The table is
//! fixed when the agent is built, so dispatch is a checked lookup followed by
//! a call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use pipewatch_types::error::AgentError;
use serde_json::Value;

use super::dispatch::Agent;

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, AgentError>> + Send + Sync>;

/// An agent whose actions are async closures.
///
/// ```
/// use pipewatch_core::agent::action::ActionAgent;
///
/// let echo = ActionAgent::new("echo").with_action("run", |input| async move { Ok(input) });
/// ```
#[derive(Clone)]
pub struct ActionAgent {
    name: String,
    handlers: HashMap<String, Handler>,
}

impl ActionAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
        }
    }

    /// Add (or replace) the handler for `action`.
    pub fn with_action<F, Fut>(mut self, action: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AgentError>> + Send + 'static,
    {
        let handler: Handler =
            Arc::new(move |input| -> BoxFuture<'static, Result<Value, AgentError>> {
                Box::pin(handler(input))
            });
        self.handlers.insert(action.into(), handler);
        self
    }
}

impl Agent for ActionAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    async fn dispatch(&self, action: &str, input: Value) -> Result<Value, AgentError> {
        match self.handlers.get(action) {
            Some(handler) => handler(input).await,
            None => Err(AgentError::UnknownAction {
                agent: self.name.clone(),
                action: action.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for ActionAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionAgent")
            .field("name", &self.name)
            .field("actions", &self.actions())
            .finish()
    }
}

//! Agent registry for runtime agent lookup.
//!
//! A simple name-indexed registry of boxed agents. Built once at start-up and
//! shared read-only with the engine.

use std::collections::HashMap;

use super::box_agent::BoxAgent;
use super::dispatch::Agent;

/// Registry of available agents, indexed by name.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: HashMap<String, BoxAgent>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Register an agent under the given name.
    ///
    /// If an agent with this name already exists, it is replaced.
    pub fn register(&mut self, name: impl Into<String>, agent: BoxAgent) {
        self.agents.insert(name.into(), agent);
    }

    /// Box and register an agent under its own name.
    pub fn with_agent<T: Agent + 'static>(mut self, agent: T) -> Self {
        let name = agent.name().to_string();
        self.register(name, BoxAgent::new(agent));
        self
    }

    /// Look up an agent by name.
    pub fn get(&self, name: &str) -> Option<&BoxAgent> {
        self.agents.get(name)
    }

    /// List all registered agent names, sorted.
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::action::ActionAgent;
    use serde_json::json;

    #[tokio::test]
    async fn register_and_get() {
        let registry = AgentRegistry::new()
            .with_agent(ActionAgent::new("echo").with_action("run", |i| async move { Ok(i) }));

        let agent = registry.get("echo").unwrap();
        assert_eq!(agent.dispatch("run", json!("hi")).await.unwrap(), json!("hi"));
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn register_replaces_existing() {
        let mut registry = AgentRegistry::new();
        registry.register(
            "notify",
            BoxAgent::new(ActionAgent::new("notify").with_action("send", |_| async move {
                Ok(json!("v1"))
            })),
        );
        registry.register(
            "notify",
            BoxAgent::new(ActionAgent::new("notify").with_action("send", |_| async move {
                Ok(json!("v2"))
            })),
        );

        assert_eq!(registry.len(), 1);
        let out = registry
            .get("notify")
            .unwrap()
            .dispatch("send", json!(null))
            .await
            .unwrap();
        assert_eq!(out, json!("v2"));
    }

    #[test]
    fn list_names_sorted() {
        let registry = AgentRegistry::new()
            .with_agent(ActionAgent::new("notify"))
            .with_agent(ActionAgent::new("ci"));
        assert_eq!(registry.list_names(), vec!["ci", "notify"]);
        assert!(!registry.is_empty());
        assert!(AgentRegistry::default().is_empty());
    }
}

//! Built-in agents.
//!
//! - `http`: outbound HTTP calls via reqwest
//! - `notify`: logged notifications and escalations
//! - `echo`: returns its input, for dry runs and smoke tests

pub mod http;
pub mod notify;

use pipewatch_core::agent::action::ActionAgent;
use pipewatch_core::agent::registry::AgentRegistry;
use pipewatch_types::config::AgentSettings;

pub use http::HttpAgent;
pub use notify::NotifyAgent;

/// `echo.run` returns its input unchanged.
pub fn echo_agent() -> ActionAgent {
    ActionAgent::new("echo").with_action("run", |input| async move { Ok(input) })
}

/// Registry holding every built-in agent.
pub fn builtin_agents(settings: &AgentSettings) -> Result<AgentRegistry, reqwest::Error> {
    let registry = AgentRegistry::new()
        .with_agent(HttpAgent::new(&settings.http)?)
        .with_agent(NotifyAgent::new())
        .with_agent(echo_agent());
    tracing::debug!(agents = ?registry.list_names(), "built-in agents registered");
    Ok(registry)
}

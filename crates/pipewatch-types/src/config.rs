//! Configuration types for pipewatch.
//!
//! `EngineConfig` is the top-level `config.toml` controlling the engine, the
//! REST server and the built-in agents. Every field has a default so an empty
//! file (or none at all) is a valid configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loaded from `~/.pipewatch/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub agents: AgentSettings,
}

/// Execution engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Capacity of the execution event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Limit applied to execution listings when the caller gives none.
    #[serde(default = "default_list_limit")]
    pub default_list_limit: u32,
    /// Which bindings `${name}` tokens in step conditions can see.
    #[serde(default)]
    pub condition_scope: ConditionScope,
    /// Resume persisted running executions when the server starts.
    #[serde(default)]
    pub recover_on_start: bool,
}

fn default_event_capacity() -> usize {
    256
}

fn default_list_limit() -> u32 {
    20
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            default_list_limit: default_list_limit(),
            condition_scope: ConditionScope::default(),
            recover_on_start: false,
        }
    }
}

/// Lookup scope for condition templates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionScope {
    /// Step outputs only. Context keys stay unresolved.
    Outputs,
    /// Step outputs, then the execution context.
    #[default]
    OutputsAndContext,
}

/// REST server bind address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Built-in agent settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub http: HttpAgentSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpAgentSettings {
    /// Per-request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for HttpAgentSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

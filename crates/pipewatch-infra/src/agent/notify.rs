//! Notification agent.
//!
//! `send` and `escalate` write the notification to the log (`info` and `warn`
//! respectively) and return it as the step result. Delivery channels beyond the log are
//! configured per deployment by registering a different `notify` agent.

use chrono::{DateTime, Utc};
use pipewatch_core::agent::dispatch::Agent;
use pipewatch_types::error::AgentError;
use serde::Serialize;
use serde_json::{json, Value};

const DEFAULT_RECIPIENT: &str = "oncall";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Send,
    Escalate,
}

/// A notification handed to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub message: String,
    pub priority: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Stateless: nothing is retained once the notification is logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyAgent;

impl NotifyAgent {
    pub fn new() -> Self {
        Self
    }
}

/// Accepts `{recipient?, message, priority?}` or a bare message string.
fn parse_notification(kind: NotificationKind, input: Value) -> Result<Notification, AgentError> {
    let (recipient, message, priority) = match input {
        Value::String(message) => (None, message, None),
        Value::Object(mut fields) => {
            let message = match fields.remove("message") {
                Some(Value::String(s)) => s,
                Some(Value::Null) | None => {
                    return Err(AgentError::InvalidInput("'message' is required".into()));
                }
                Some(other) => other.to_string(),
            };
            let recipient = fields
                .remove("recipient")
                .and_then(|v| v.as_str().map(str::to_string));
            let priority = fields
                .remove("priority")
                .and_then(|v| v.as_str().map(str::to_string));
            (recipient, message, priority)
        }
        other => {
            return Err(AgentError::InvalidInput(format!(
                "expected a message string or object, got {other}"
            )));
        }
    };

    Ok(Notification {
        kind,
        recipient: recipient.unwrap_or_else(|| DEFAULT_RECIPIENT.to_string()),
        message,
        priority,
        timestamp: Utc::now(),
    })
}

impl Agent for NotifyAgent {
    fn name(&self) -> &str {
        "notify"
    }

    fn actions(&self) -> Vec<String> {
        vec!["escalate".to_string(), "send".to_string()]
    }

    async fn dispatch(&self, action: &str, input: Value) -> Result<Value, AgentError> {
        let kind = match action {
            "send" => NotificationKind::Send,
            "escalate" => NotificationKind::Escalate,
            _ => {
                return Err(AgentError::UnknownAction {
                    agent: "notify".to_string(),
                    action: action.to_string(),
                });
            }
        };
        let notification = parse_notification(kind, input)?;

        match kind {
            NotificationKind::Send => tracing::info!(
                recipient = %notification.recipient,
                priority = ?notification.priority,
                message = %notification.message,
                "notification sent"
            ),
            NotificationKind::Escalate => tracing::warn!(
                recipient = %notification.recipient,
                priority = ?notification.priority,
                message = %notification.message,
                "notification escalated"
            ),
        }

        let mut output = json!({
            "delivered": true,
            "kind": notification.kind,
            "recipient": notification.recipient,
            "message": notification.message,
            "timestamp": notification.timestamp,
        });
        if let Some(priority) = notification.priority {
            output["priority"] = Value::String(priority);
        }
        if kind == NotificationKind::Escalate {
            output["escalated"] = Value::Bool(true);
        }
        Ok(output)
    }
}

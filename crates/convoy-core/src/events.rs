//! Event payloads published on the hub's domain brokers.
//!
//! Payloads are immutable once published. Within one session, the agent
//! domain follows turn order: `text_delta* → tool_call → tool_result → … →
//! complete | cancelled | error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::types::ToolCall;

/// Progress of an agent turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub session_id: String,
    pub kind: AgentEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEventKind {
    /// Text fragment from the streaming assistant message
    TextDelta { delta: String },

    /// Model requested a tool invocation
    ToolCall { call: ToolCall },

    /// Tool finished; result is in history
    ToolResult {
        call_id: String,
        name: String,
        content: String,
        is_error: bool,
    },

    /// Turn finished with a final assistant message
    Complete { message_id: String },

    /// Turn was cancelled; any partial text has been persisted
    Cancelled,

    /// Turn failed
    Error { error: String },

    /// Summary message written and set as the session's summary pointer
    Summarized { message_id: String },
}

impl AgentEvent {
    pub fn new(session_id: impl Into<String>, kind: AgentEventKind) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
        }
    }

    /// Whether this event ends a Send
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            AgentEventKind::Complete { .. } | AgentEventKind::Cancelled | AgentEventKind::Error { .. }
        )
    }
}

/// Tool activity, for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEvent {
    pub session_id: String,
    pub call_id: String,
    pub tool_name: String,
    pub kind: ToolEventKind,
    /// Human-readable activity line, e.g. "Reading src/main.rs"
    pub summary: String,
    /// Progress text or failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Wall time, set on completed/failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolEventKind {
    Started,
    Completed,
    Failed,
    Progress,
}

/// Credential lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub provider_id: String,
    pub kind: AuthEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    Expiring,
    Expired,
    Refreshed,
    RefreshFailed,
}

impl AuthEvent {
    pub fn new(
        provider_id: impl Into<String>,
        kind: AuthEventKind,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind,
            expires_at,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Task-list change for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoEvent {
    pub session_id: String,
    pub todos: Vec<TodoItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub content: String,
    pub status: TodoStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_kinds() {
        let terminal = [
            AgentEventKind::Complete {
                message_id: "m".to_string(),
            },
            AgentEventKind::Cancelled,
            AgentEventKind::Error {
                error: "boom".to_string(),
            },
        ];
        for kind in terminal {
            assert!(AgentEvent::new("s", kind).is_terminal());
        }
        assert!(!AgentEvent::new(
            "s",
            AgentEventKind::TextDelta {
                delta: "x".to_string()
            }
        )
        .is_terminal());
    }

    #[test]
    fn todo_items_parse_from_tool_metadata() {
        let todos: Vec<TodoItem> = serde_json::from_str(
            r#"[{"content":"write tests","status":"in_progress"},{"content":"ship","status":"pending"}]"#,
        )
        .unwrap();
        assert_eq!(todos[0].status, TodoStatus::InProgress);
        assert_eq!(todos[1].content, "ship");
    }
}

//! Conversation data model
//!
//! A session owns an ordered, append-only log of `Message`s. Each message is
//! a role plus an ordered list of `Part`s. Tool calls and tool results are
//! correlated by call id: every `ToolCall` in an assistant message must be
//! answered by exactly one `ToolResult` in the tool message that follows it.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(anyhow::anyhow!("Unknown message role: {}", other)),
        }
    }
}

/// Content block inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Part {
    #[serde(rename = "text")]
    Text { text: String },

    /// Extended thinking emitted by the model
    #[serde(rename = "reasoning")]
    Reasoning { reasoning: String },

    #[serde(rename = "tool_call")]
    ToolCall {
        id: String,
        name: String,
        input: Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_call_id: String,
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn tool_call(call: &ToolCall) -> Self {
        Part::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        }
    }
}

/// Persisted conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// New message with a fresh id, stamped now
    pub fn new(session_id: impl Into<String>, role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            parts,
            created_at: Utc::now(),
        }
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::ToolCall { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Call ids answered by this message's tool results
    pub fn tool_result_ids(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::ToolCall { .. }))
    }
}

/// Violation of the call/result pairing rule in a message log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingError {
    /// A tool call that no later tool message answers
    MissingResult { call_id: String },
    /// A tool result whose call id was never issued
    OrphanResult { call_id: String },
    /// Two results for the same call id, or the same call id issued twice
    Duplicate { call_id: String },
}

impl fmt::Display for PairingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingError::MissingResult { call_id } => {
                write!(f, "tool call {} has no result", call_id)
            }
            PairingError::OrphanResult { call_id } => {
                write!(f, "tool result {} has no matching call", call_id)
            }
            PairingError::Duplicate { call_id } => write!(f, "call id {} appears twice", call_id),
        }
    }
}

impl std::error::Error for PairingError {}

/// Check that every tool call in the log has exactly one result and that
/// no result refers to an unknown call.
pub fn check_tool_pairing(messages: &[Message]) -> Result<(), PairingError> {
    let mut issued: HashSet<&str> = HashSet::new();
    let mut answered: HashSet<&str> = HashSet::new();

    for message in messages {
        for part in &message.parts {
            match part {
                Part::ToolCall { id, .. } => {
                    if !issued.insert(id.as_str()) {
                        return Err(PairingError::Duplicate {
                            call_id: id.clone(),
                        });
                    }
                }
                Part::ToolResult { tool_call_id, .. } => {
                    if !issued.contains(tool_call_id.as_str()) {
                        return Err(PairingError::OrphanResult {
                            call_id: tool_call_id.clone(),
                        });
                    }
                    if !answered.insert(tool_call_id.as_str()) {
                        return Err(PairingError::Duplicate {
                            call_id: tool_call_id.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(missing) = issued.difference(&answered).next() {
        return Err(PairingError::MissingResult {
            call_id: (*missing).to_string(),
        });
    }

    Ok(())
}

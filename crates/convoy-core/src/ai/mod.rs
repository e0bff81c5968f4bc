//! Conversation data model and the model client boundary

pub mod client;
pub mod types;

pub use client::{
    FinishReason, ModelClient, ModelRequest, ModelStream, StreamPart, ToolDefinition,
};
pub use types::{check_tool_pairing, Message, PairingError, Part, Role, ToolCall};

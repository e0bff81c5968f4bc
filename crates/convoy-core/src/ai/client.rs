//! Model client boundary
//!
//! Concrete provider transports live outside this crate. They implement
//! `ModelClient`: given the ordered history, produce a stream of text
//! fragments, reasoning fragments, tool-invocation requests, and a terminal
//! finish signal, or a `ModelError` that keeps authentication failures apart
//! from malformed requests.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{Message, ToolCall};
use crate::error::ModelError;

/// Tool advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

/// One item of a model stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    TextDelta { delta: String },
    ReasoningDelta { delta: String },
    /// Fully-assembled tool call (arguments complete)
    ToolCall(ToolCall),
    Finish { reason: FinishReason },
}

/// Everything the model needs for one turn
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

pub type ModelStream = Pin<Box<dyn Stream<Item = Result<StreamPart, ModelError>> + Send>>;

/// Streaming LLM transport
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier, for logging
    fn model_id(&self) -> &str;

    /// Open a stream for one model turn.
    ///
    /// Authentication failures must surface as `ModelError::Unauthorized` or
    /// `ModelError::Forbidden`, whether they occur here or as the first
    /// stream item.
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError>;
}

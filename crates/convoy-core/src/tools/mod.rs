//! Tool executor boundary
//!
//! Concrete tools (file edits, shell, search) live outside the engine. The
//! agent hands each call to a `ToolExecutor` together with a `ToolContext`
//! carrying the turn's cancellation token and a progress reporter.

mod summary;

pub use summary::{Summarizer, SummaryRegistry, ToolKind};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::ai::{ToolCall, ToolDefinition};
use crate::events::{ToolEvent, ToolEventKind};
use crate::pubsub::EventHub;

/// Result of one tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
    /// Structured side data (e.g. the task list for `todos`)
    pub metadata: Option<Value>,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            metadata: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Publishes `progress` tool events for one call
#[derive(Clone)]
pub struct ProgressReporter {
    hub: Arc<EventHub>,
    session_id: String,
    call_id: String,
    tool_name: String,
    summary: String,
}

impl ProgressReporter {
    pub(crate) fn new(hub: Arc<EventHub>, session_id: &str, call: &ToolCall, summary: &str) -> Self {
        Self {
            hub,
            session_id: session_id.to_string(),
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            summary: summary.to_string(),
        }
    }

    /// Non-blocking; dropped for slow subscribers like any other event
    pub fn report(&self, detail: impl Into<String>) {
        self.hub.publish_tool(ToolEvent {
            session_id: self.session_id.clone(),
            call_id: self.call_id.clone(),
            tool_name: self.tool_name.clone(),
            kind: ToolEventKind::Progress,
            summary: self.summary.clone(),
            detail: Some(detail.into()),
            duration_ms: None,
        });
    }
}

/// Per-call context handed to the executor
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: String,
    /// Cancelled when the session's turn is cancelled; honoring it is optional
    pub cancel: CancellationToken,
    pub progress: ProgressReporter,
}

/// Executes named tools with structured input.
///
/// Must tolerate concurrent calls for independent tool calls of one turn.
/// Failures are reported in the output's error flag, not as a Rust error.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Tools advertised to the model
    fn definitions(&self) -> Vec<ToolDefinition>;

    async fn execute(&self, call: &ToolCall, ctx: ToolContext) -> ToolOutput;
}

/// Executor with no tools; every call fails
pub struct NoTools;

#[async_trait]
impl ToolExecutor for NoTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    async fn execute(&self, call: &ToolCall, _ctx: ToolContext) -> ToolOutput {
        ToolOutput::error(format!("Unknown tool: {}", call.name))
    }
}

//! Tool execution for the agent loop.
//!
//! Handles:
//! - Sequential or concurrent dispatch of one turn's tool calls
//! - Tool activity events (started / completed / failed) with summaries
//! - Task-list events from the `todos` tool's metadata
//! - Output truncation
//!
//! Once a call is dispatched it runs to completion even if the turn is
//! cancelled; calls not yet dispatched get a cancelled error result, so every
//! tool call in history is answered.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::ai::{Part, ToolCall};
use crate::events::{TodoEvent, TodoItem, ToolEvent, ToolEventKind};
use crate::pubsub::EventHub;
use crate::tools::{
    ProgressReporter, SummaryRegistry, ToolContext, ToolExecutor, ToolKind, ToolOutput,
};

const CANCELLED_BEFORE_START: &str = "Tool call cancelled before execution";

/// A finished call, in call order
pub(crate) struct ToolExecution {
    pub call: ToolCall,
    pub output: ToolOutput,
}

impl ToolExecution {
    pub(crate) fn to_part(&self) -> Part {
        Part::ToolResult {
            tool_call_id: self.call.id.clone(),
            name: self.call.name.clone(),
            content: self.output.content.clone(),
            is_error: self.output.is_error,
        }
    }
}

pub(crate) struct BatchOutcome {
    pub executions: Vec<ToolExecution>,
    /// Token was cancelled at some point during the batch
    pub cancelled: bool,
}

/// Everything a batch needs besides the calls
pub(crate) struct ExecutionEnv<'a> {
    pub tools: &'a Arc<dyn ToolExecutor>,
    pub hub: &'a Arc<EventHub>,
    pub summaries: &'a SummaryRegistry,
    pub session_id: &'a str,
    pub token: &'a CancellationToken,
    pub max_output_chars: usize,
    pub parallel: bool,
}

pub(crate) async fn execute_tools(env: &ExecutionEnv<'_>, calls: &[ToolCall]) -> BatchOutcome {
    let executions = if env.parallel && calls.len() > 1 {
        let pending = calls.iter().map(|call| execute_one(env, call));
        futures::future::join_all(pending).await
    } else {
        let mut executions = Vec::with_capacity(calls.len());
        for call in calls {
            executions.push(execute_one(env, call).await);
        }
        executions
    };

    BatchOutcome {
        executions,
        cancelled: env.token.is_cancelled(),
    }
}

async fn execute_one(env: &ExecutionEnv<'_>, call: &ToolCall) -> ToolExecution {
    let summary = env.summaries.summarize(call);

    if env.token.is_cancelled() {
        tracing::debug!(tool = %call.name, call_id = %call.id, "Skipping tool call after cancel");
        return ToolExecution {
            call: call.clone(),
            output: ToolOutput::error(CANCELLED_BEFORE_START),
        };
    }

    publish_tool_event(env, call, ToolEventKind::Started, &summary, None, None);
    tracing::info!(tool = %call.name, call_id = %call.id, "Executing tool");

    let ctx = ToolContext {
        session_id: env.session_id.to_string(),
        cancel: env.token.clone(),
        progress: ProgressReporter::new(Arc::clone(env.hub), env.session_id, call, &summary),
    };

    let start = Instant::now();
    let mut output = env.tools.execute(call, ctx).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    output.content = truncate_output(&output.content, env.max_output_chars);

    if output.is_error {
        tracing::warn!(tool = %call.name, call_id = %call.id, duration_ms, "Tool failed");
        let detail = first_line(&output.content);
        publish_tool_event(
            env,
            call,
            ToolEventKind::Failed,
            &summary,
            Some(detail),
            Some(duration_ms),
        );
    } else {
        tracing::debug!(tool = %call.name, call_id = %call.id, duration_ms, "Tool completed");
        publish_tool_event(
            env,
            call,
            ToolEventKind::Completed,
            &summary,
            None,
            Some(duration_ms),
        );
    }

    if ToolKind::from_name(&call.name) == Some(ToolKind::Todos) && !output.is_error {
        if let Some(todos) = output.metadata.as_ref().and_then(parse_todos) {
            env.hub.publish_todos(TodoEvent {
                session_id: env.session_id.to_string(),
                todos,
            });
        }
    }

    ToolExecution {
        call: call.clone(),
        output,
    }
}

fn publish_tool_event(
    env: &ExecutionEnv<'_>,
    call: &ToolCall,
    kind: ToolEventKind,
    summary: &str,
    detail: Option<String>,
    duration_ms: Option<u64>,
) {
    env.hub.publish_tool(ToolEvent {
        session_id: env.session_id.to_string(),
        call_id: call.id.clone(),
        tool_name: call.name.clone(),
        kind,
        summary: summary.to_string(),
        detail,
        duration_ms,
    });
}

/// Task list from `todos` metadata: either `{"todos": [...]}` or a bare array
fn parse_todos(metadata: &Value) -> Option<Vec<TodoItem>> {
    let list = metadata.get("todos").unwrap_or(metadata);
    serde_json::from_value(list.clone()).ok()
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").to_string()
}

/// Truncate tool output at a line boundary, with a marker noting the cut
pub(crate) fn truncate_output(output: &str, max_chars: usize) -> String {
    if output.len() <= max_chars {
        return output.to_string();
    }

    let truncated_len = floor_char_boundary(output, max_chars);
    let truncated = &output[..truncated_len];
    let break_point = truncated.rfind('\n').unwrap_or(truncated_len);
    let clean = &output[..break_point];
    format!(
        "{}\n\n[... OUTPUT TRUNCATED: {} chars -> {} chars ...]",
        clean,
        output.len(),
        clean.len()
    )
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut boundary = index.min(text.len());
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

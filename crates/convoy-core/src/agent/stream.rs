//! Stream processing for one model turn.
//!
//! Consumes `StreamPart`s and:
//! - Accumulates text, reasoning, and tool calls
//! - Forwards each text fragment as it arrives
//! - Stops on cancellation, stream error, or `stream_timeout` of silence

use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::ai::{FinishReason, ModelStream, Part, StreamPart, ToolCall};
use crate::error::ModelError;

/// What one model turn produced, complete or not
#[derive(Debug, Default)]
pub(crate) struct StreamOutcome {
    pub text: String,
    pub reasoning: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish: Option<FinishReason>,
    pub cancelled: bool,
    pub error: Option<ModelError>,
}

impl StreamOutcome {
    pub(crate) fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Default::default()
        }
    }

    pub(crate) fn failed(error: ModelError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// Whether anything reached the caller before the stream ended
    pub(crate) fn produced_output(&self) -> bool {
        !self.text.is_empty() || !self.reasoning.is_empty() || !self.tool_calls.is_empty()
    }

    /// Auth failure before any output; eligible for the credential retry
    pub(crate) fn is_retryable_auth_failure(&self) -> bool {
        !self.cancelled
            && !self.produced_output()
            && self.error.as_ref().is_some_and(ModelError::is_auth)
    }

    /// Text and reasoning parts, without tool calls
    pub(crate) fn content_parts(&self) -> Vec<Part> {
        let mut parts = Vec::new();
        if !self.reasoning.is_empty() {
            parts.push(Part::Reasoning {
                reasoning: self.reasoning.clone(),
            });
        }
        if !self.text.is_empty() {
            parts.push(Part::text(self.text.clone()));
        }
        parts
    }
}

/// Drain a model stream, calling `on_text` for every text fragment.
pub(crate) async fn process_stream(
    mut stream: ModelStream,
    token: &CancellationToken,
    stream_timeout: Duration,
    on_text: &mut (dyn FnMut(&str) + Send),
) -> StreamOutcome {
    let mut outcome = StreamOutcome::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            next = tokio::time::timeout(stream_timeout, stream.next()) => next,
        };

        let part = match next {
            Ok(Some(Ok(part))) => part,
            Ok(Some(Err(e))) => {
                outcome.error = Some(e);
                break;
            }
            Ok(None) => break,
            Err(_) => {
                outcome.error = Some(ModelError::Timeout(stream_timeout.as_secs()));
                break;
            }
        };

        match part {
            StreamPart::TextDelta { delta } => {
                on_text(&delta);
                outcome.text.push_str(&delta);
            }
            StreamPart::ReasoningDelta { delta } => outcome.reasoning.push_str(&delta),
            StreamPart::ToolCall(call) => outcome.tool_calls.push(call),
            StreamPart::Finish { reason } => {
                outcome.finish = Some(reason);
                break;
            }
        }
    }

    outcome
}

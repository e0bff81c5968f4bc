//! Direct streaming callbacks
//!
//! Invoked synchronously on the worker running the turn. They must not block
//! or perform I/O; a consumer that needs UI-thread affinity re-dispatches on
//! its own (the bridge does exactly that for the event path).

use crate::ai::{Message, ToolCall};
use crate::error::AgentError;
use crate::tools::ToolOutput;

type TextFn = Box<dyn Fn(&str) + Send + Sync>;
type ToolCallFn = Box<dyn Fn(&ToolCall) + Send + Sync>;
type ToolResultFn = Box<dyn Fn(&ToolCall, &ToolOutput) + Send + Sync>;
type CompleteFn = Box<dyn Fn(&Message) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&AgentError) + Send + Sync>;

/// Optional per-Send callbacks; unset ones are skipped
#[derive(Default)]
pub struct StreamCallbacks {
    on_text: Option<TextFn>,
    on_tool_call: Option<ToolCallFn>,
    on_tool_result: Option<ToolResultFn>,
    on_complete: Option<CompleteFn>,
    on_error: Option<ErrorFn>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_text(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_text = Some(Box::new(f));
        self
    }

    pub fn on_tool_call(mut self, f: impl Fn(&ToolCall) + Send + Sync + 'static) -> Self {
        self.on_tool_call = Some(Box::new(f));
        self
    }

    pub fn on_tool_result(
        mut self,
        f: impl Fn(&ToolCall, &ToolOutput) + Send + Sync + 'static,
    ) -> Self {
        self.on_tool_result = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&Message) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&AgentError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn text(&self, delta: &str) {
        if let Some(f) = &self.on_text {
            f(delta);
        }
    }

    pub(crate) fn tool_call(&self, call: &ToolCall) {
        if let Some(f) = &self.on_tool_call {
            f(call);
        }
    }

    pub(crate) fn tool_result(&self, call: &ToolCall, output: &ToolOutput) {
        if let Some(f) = &self.on_tool_result {
            f(call, output);
        }
    }

    pub(crate) fn complete(&self, message: &Message) {
        if let Some(f) = &self.on_complete {
            f(message);
        }
    }

    pub(crate) fn error(&self, error: &AgentError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}

impl std::fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("on_text", &self.on_text.is_some())
            .field("on_tool_call", &self.on_tool_call.is_some())
            .field("on_tool_result", &self.on_tool_result.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

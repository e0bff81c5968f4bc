//! Human-readable activity lines for tool calls
//!
//! `ToolKind` names the built-in tool families. `SummaryRegistry` maps a tool
//! name to a summarizer; new tools register their own without touching the
//! agent, and unknown names fall back to a generic line.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::ai::ToolCall;

/// Built-in tool families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Read,
    Write,
    Edit,
    Bash,
    Grep,
    Glob,
    List,
    WebFetch,
    WebSearch,
    Todos,
}

impl ToolKind {
    pub const ALL: [ToolKind; 10] = [
        ToolKind::Read,
        ToolKind::Write,
        ToolKind::Edit,
        ToolKind::Bash,
        ToolKind::Grep,
        ToolKind::Glob,
        ToolKind::List,
        ToolKind::WebFetch,
        ToolKind::WebSearch,
        ToolKind::Todos,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "read" => Some(ToolKind::Read),
            "write" => Some(ToolKind::Write),
            "edit" => Some(ToolKind::Edit),
            "bash" => Some(ToolKind::Bash),
            "grep" => Some(ToolKind::Grep),
            "glob" => Some(ToolKind::Glob),
            "list" => Some(ToolKind::List),
            "web_fetch" => Some(ToolKind::WebFetch),
            "web_search" => Some(ToolKind::WebSearch),
            "todos" => Some(ToolKind::Todos),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Read => "read",
            ToolKind::Write => "write",
            ToolKind::Edit => "edit",
            ToolKind::Bash => "bash",
            ToolKind::Grep => "grep",
            ToolKind::Glob => "glob",
            ToolKind::List => "list",
            ToolKind::WebFetch => "web_fetch",
            ToolKind::WebSearch => "web_search",
            ToolKind::Todos => "todos",
        }
    }

    fn summarize(&self, input: &Value) -> String {
        let field = |key: &str| input.get(key).and_then(Value::as_str).unwrap_or("");
        match self {
            ToolKind::Read => format!("Reading {}", field("file_path")),
            ToolKind::Write => format!("Writing {}", field("file_path")),
            ToolKind::Edit => format!("Editing {}", field("file_path")),
            ToolKind::Bash => format!("Running `{}`", first_line(field("command"), 60)),
            ToolKind::Grep => format!("Searching for \"{}\"", field("pattern")),
            ToolKind::Glob => format!("Finding {}", field("pattern")),
            ToolKind::List => match field("path") {
                "" => "Listing files".to_string(),
                path => format!("Listing {}", path),
            },
            ToolKind::WebFetch => format!("Fetching {}", field("url")),
            ToolKind::WebSearch => format!("Searching the web for \"{}\"", field("query")),
            ToolKind::Todos => {
                let count = input
                    .get("todos")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                format!("Updating task list ({} items)", count)
            }
        }
    }
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max_chars {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}

pub type Summarizer = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Tool name to summarizer
#[derive(Clone)]
pub struct SummaryRegistry {
    summarizers: HashMap<String, Summarizer>,
}

impl SummaryRegistry {
    /// Registry without any summarizers; every call gets the generic line
    pub fn empty() -> Self {
        Self {
            summarizers: HashMap::new(),
        }
    }

    /// Registry preloaded with every `ToolKind`
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for kind in ToolKind::ALL {
            registry.register(kind.name(), move |input| kind.summarize(input));
        }
        registry
    }

    /// Add or replace the summarizer for a tool name
    pub fn register<F>(&mut self, name: impl Into<String>, summarizer: F)
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.summarizers.insert(name.into(), Arc::new(summarizer));
    }

    pub fn summarize(&self, call: &ToolCall) -> String {
        match self.summarizers.get(&call.name) {
            Some(summarizer) => summarizer(&call.input),
            None => format!("Running {}", call.name),
        }
    }
}

impl Default for SummaryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for SummaryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.summarizers.keys().collect();
        names.sort();
        f.debug_struct("SummaryRegistry").field("tools", &names).finish()
    }
}

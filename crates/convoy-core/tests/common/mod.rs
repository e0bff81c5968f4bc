//! Scripted collaborators shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::ReceiverStream;

use convoy_core::ai::{
    FinishReason, Message, ModelClient, ModelRequest, ModelStream, Role, StreamPart, ToolCall,
    ToolDefinition,
};
use convoy_core::logging::Telemetry;
use convoy_core::storage::{ConversationStore, Database, SessionInfo, SqliteStore};
use convoy_core::tools::{ToolContext, ToolExecutor, ToolOutput};
use convoy_core::{Agent, EngineConfig, EventHub, ModelError, Subscription};

pub type Item = Result<StreamPart, ModelError>;

/// One scripted model call
pub enum Reply {
    /// Stream these items, then end
    Parts(Vec<Item>),
    /// Fail when opening the stream
    Reject(ModelError),
    /// Stream whatever the test pushes through the channel
    Channel(mpsc::Receiver<Item>),
}

pub fn text(delta: &str) -> Item {
    Ok(StreamPart::TextDelta {
        delta: delta.to_string(),
    })
}

pub fn tool_call(id: &str, name: &str) -> Item {
    Ok(StreamPart::ToolCall(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        input: json!({"file_path": format!("{}.rs", id)}),
    }))
}

pub fn finish(reason: FinishReason) -> Item {
    Ok(StreamPart::Finish { reason })
}

pub fn answer(reply: &str) -> Reply {
    Reply::Parts(vec![text(reply), finish(FinishReason::Stop)])
}

pub fn calls(ids: &[(&str, &str)]) -> Reply {
    let mut items: Vec<Item> = ids.iter().map(|(id, name)| tool_call(id, name)).collect();
    items.push(finish(FinishReason::ToolCalls));
    Reply::Parts(items)
}

/// Open a gated stream the test feeds by hand
pub fn channel() -> (mpsc::Sender<Item>, Reply) {
    let (tx, rx) = mpsc::channel(16);
    (tx, Reply::Channel(rx))
}

/// Model client that plays back a fixed list of replies
pub struct ScriptedClient {
    id: String,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(id: &str, replies: Vec<Reply>) -> Arc<Self> {
        Self::with_delay(id, replies, Duration::ZERO)
    }

    /// Every call sleeps `delay` before returning its stream
    pub fn with_delay(id: &str, replies: Vec<Reply>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Parts(items)) => Ok(Box::pin(futures::stream::iter(items))),
            Some(Reply::Reject(error)) => Err(error),
            Some(Reply::Channel(rx)) => Ok(Box::pin(ReceiverStream::new(rx))),
            None => Err(ModelError::BadRequest("script exhausted".to_string())),
        }
    }
}

/// Tool executor that answers every call, recording what ran.
///
/// `slow` waits for the turn's cancellation token; `stubborn` ignores it and
/// waits for `release`; `fail` returns an error.
#[derive(Default)]
pub struct RecordingTools {
    executed: Mutex<Vec<String>>,
    release: Notify,
}

impl RecordingTools {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Let a running `stubborn` call finish
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl ToolExecutor for RecordingTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "read".to_string(),
            description: "Read a file".to_string(),
            input_schema: json!({"type": "object"}),
        }]
    }

    async fn execute(&self, call: &ToolCall, ctx: ToolContext) -> ToolOutput {
        self.executed.lock().push(call.id.clone());
        match call.name.as_str() {
            "slow" => {
                ctx.cancel.cancelled().await;
                ToolOutput::error("interrupted")
            }
            "stubborn" => {
                self.release.notified().await;
                ToolOutput::success("finished anyway")
            }
            "fail" => ToolOutput::error("no such file"),
            _ => ToolOutput::success(format!("contents of {}", input_path(&call.input))),
        }
    }
}

fn input_path(input: &Value) -> &str {
    input.get("file_path").and_then(Value::as_str).unwrap_or("?")
}

pub struct Harness {
    pub agent: Agent,
    pub hub: Arc<EventHub>,
    pub store: Arc<SqliteStore>,
}

pub fn harness(client: Arc<dyn ModelClient>, tools: Arc<dyn ToolExecutor>) -> Harness {
    harness_with_config(client, tools, EngineConfig::default())
}

pub fn harness_with_config(
    client: Arc<dyn ModelClient>,
    tools: Arc<dyn ToolExecutor>,
    config: EngineConfig,
) -> Harness {
    let hub = Arc::new(EventHub::from_config(&config, Telemetry::new("test")));
    hub.start().unwrap();
    let store = Arc::new(SqliteStore::new(Database::open_in_memory().unwrap()));
    let agent = Agent::builder(client, tools, store.clone(), hub.clone())
        .config(config)
        .build();
    Harness { agent, hub, store }
}

/// SQLite store that rejects appends of one role
pub struct FailingStore {
    inner: SqliteStore,
    fail_role: Role,
}

impl FailingStore {
    pub fn new(fail_role: Role) -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteStore::new(Database::open_in_memory().unwrap()),
            fail_role,
        })
    }
}

impl ConversationStore for FailingStore {
    fn create_session(&self, title: &str) -> anyhow::Result<SessionInfo> {
        self.inner.create_session(title)
    }

    fn ensure_session(&self, session_id: &str) -> anyhow::Result<SessionInfo> {
        self.inner.ensure_session(session_id)
    }

    fn get_session(&self, session_id: &str) -> anyhow::Result<Option<SessionInfo>> {
        self.inner.get_session(session_id)
    }

    fn list_sessions(&self) -> anyhow::Result<Vec<SessionInfo>> {
        self.inner.list_sessions()
    }

    fn update_title(&self, session_id: &str, title: &str) -> anyhow::Result<()> {
        self.inner.update_title(session_id, title)
    }

    fn set_summary_message(&self, session_id: &str, message_id: &str) -> anyhow::Result<()> {
        self.inner.set_summary_message(session_id, message_id)
    }

    fn delete_session(&self, session_id: &str) -> anyhow::Result<bool> {
        self.inner.delete_session(session_id)
    }

    fn append_message(&self, message: &Message) -> anyhow::Result<()> {
        if message.role == self.fail_role {
            anyhow::bail!("disk I/O error");
        }
        self.inner.append_message(message)
    }

    fn list_messages(&self, session_id: &str) -> anyhow::Result<Vec<Message>> {
        self.inner.list_messages(session_id)
    }
}

pub fn agent_with_store(
    client: Arc<dyn ModelClient>,
    tools: Arc<dyn ToolExecutor>,
    store: Arc<dyn ConversationStore>,
) -> (Agent, Arc<EventHub>) {
    let hub = Arc::new(EventHub::default());
    hub.start().unwrap();
    let agent = Agent::builder(client, tools, store, hub.clone()).build();
    (agent, hub)
}

/// Everything already queued on a subscription
pub fn drain<T: Clone + Send + 'static>(subscription: &mut Subscription<T>) -> Vec<T> {
    std::iter::from_fn(|| subscription.try_recv())
        .map(|event| event.payload)
        .collect()
}

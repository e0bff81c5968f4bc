//! Agent - the conversational tool-calling loop
//!
//! `Agent::send` drives one session: stream a model turn, run the tools it
//! asks for, append results, and repeat until the model answers without
//! tools. Progress goes out twice: through the caller's `StreamCallbacks`
//! and as events on the hub's agent broker.
//!
//! Concurrency:
//! - One turn per session at a time. A second `send` (or `summarize`) on a
//!   busy session waits for the first to finish.
//! - `cancel` is non-blocking, idempotent, and safe from any thread.
//! - The model client sits behind a read/write gate. Every model call holds
//!   a read guard until its stream is drained, and `set_model` takes the
//!   write side, so a swap waits for in-flight calls and applies from the
//!   next model call on.

mod callbacks;
mod cancellation;
mod credential_retry;
mod executor;
mod session_gate;
mod stream;
mod turn;

pub use callbacks::StreamCallbacks;
pub use credential_retry::{ClientFactory, CredentialRecovery};

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::Instrument;

use crate::ai::{Message, ModelClient};
use crate::config::EngineConfig;
use crate::error::AgentError;
use crate::logging::Telemetry;
use crate::pubsub::EventHub;
use crate::storage::ConversationStore;
use crate::tools::{SummaryRegistry, ToolExecutor};

use cancellation::CancellationRegistry;
use session_gate::SessionGates;

/// Cheap to clone; clones drive the same sessions
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

pub(crate) struct AgentInner {
    model: RwLock<Arc<dyn ModelClient>>,
    tools: Arc<dyn ToolExecutor>,
    store: Arc<dyn ConversationStore>,
    hub: Arc<EventHub>,
    config: EngineConfig,
    telemetry: Telemetry,
    summaries: SummaryRegistry,
    recovery: Option<CredentialRecovery>,
    sessions: SessionGates,
    cancellations: CancellationRegistry,
}

pub struct AgentBuilder {
    model: Arc<dyn ModelClient>,
    tools: Arc<dyn ToolExecutor>,
    store: Arc<dyn ConversationStore>,
    hub: Arc<EventHub>,
    config: EngineConfig,
    telemetry: Option<Telemetry>,
    summaries: SummaryRegistry,
    recovery: Option<CredentialRecovery>,
}

impl AgentBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to the hub's telemetry handle
    pub fn telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn summaries(mut self, summaries: SummaryRegistry) -> Self {
        self.summaries = summaries;
        self
    }

    /// Enable the one-shot refresh-and-retry on authentication failures
    pub fn credential_recovery(mut self, recovery: CredentialRecovery) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn build(self) -> Agent {
        let telemetry = self
            .telemetry
            .unwrap_or_else(|| self.hub.telemetry().clone());

        Agent {
            inner: Arc::new(AgentInner {
                model: RwLock::new(self.model),
                tools: self.tools,
                store: self.store,
                hub: self.hub,
                config: self.config,
                telemetry,
                summaries: self.summaries,
                recovery: self.recovery,
                sessions: SessionGates::default(),
                cancellations: CancellationRegistry::default(),
            }),
        }
    }
}

impl Agent {
    pub fn builder(
        model: Arc<dyn ModelClient>,
        tools: Arc<dyn ToolExecutor>,
        store: Arc<dyn ConversationStore>,
        hub: Arc<EventHub>,
    ) -> AgentBuilder {
        AgentBuilder {
            model,
            tools,
            store,
            hub,
            config: EngineConfig::default(),
            telemetry: None,
            summaries: SummaryRegistry::default(),
            recovery: None,
        }
    }

    /// Append `prompt` to the session and run turns until the model answers
    /// without tool calls.
    ///
    /// Unknown session ids are created. Returns the id of the final
    /// assistant message. A cancelled turn returns `AgentError::Cancelled`
    /// after its partial content is persisted; other failures are also
    /// reported through `on_error` and an error event.
    pub async fn send(
        &self,
        session_id: &str,
        prompt: &str,
        callbacks: &StreamCallbacks,
    ) -> Result<String, AgentError> {
        let _serialized = self.inner.sessions.acquire(session_id).await;
        let turn = self.inner.cancellations.begin(session_id);

        let span = self.inner.telemetry.turn_span(session_id);
        self.inner
            .run_send(session_id, prompt, callbacks, turn.token())
            .instrument(span)
            .await
    }

    /// Cancel the in-flight turn for a session.
    ///
    /// Returns immediately. A no-op when nothing is running, including after
    /// the turn already completed or was cancelled.
    pub fn cancel(&self, session_id: &str) {
        if self.inner.cancellations.cancel(session_id) {
            tracing::info!(session_id = %session_id, "Turn cancellation requested");
        } else {
            tracing::debug!(session_id = %session_id, "Cancel with no active turn");
        }
    }

    /// Swap the model client used for subsequent model calls.
    ///
    /// Waits for model calls already streaming to finish; history is untouched.
    pub async fn set_model(&self, client: Arc<dyn ModelClient>) {
        self.inner.swap_model(client).await;
    }

    pub async fn model_id(&self) -> String {
        self.inner.model.read().await.model_id().to_string()
    }

    /// Ask the model to summarize the session and start future history from
    /// that summary. Returns the summary message id.
    pub async fn summarize(&self, session_id: &str) -> Result<String, AgentError> {
        let _serialized = self.inner.sessions.acquire(session_id).await;
        let turn = self.inner.cancellations.begin(session_id);

        let span = self.inner.telemetry.turn_span(session_id);
        self.inner
            .run_summarize(session_id, turn.token())
            .instrument(span)
            .await
    }

    /// Whether a Send or Summarize currently owns the session
    pub fn is_session_busy(&self, session_id: &str) -> bool {
        self.inner.sessions.is_busy(session_id)
    }

    /// Sessions with a turn in flight
    pub fn active_sessions(&self) -> Vec<String> {
        let mut sessions = self.inner.cancellations.sessions();
        sessions.sort();
        sessions
    }

    /// Read snapshot of a session's log
    pub fn messages(&self, session_id: &str) -> Result<Vec<Message>, AgentError> {
        self.inner
            .store
            .list_messages(session_id)
            .map_err(AgentError::store)
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.inner.hub
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.inner.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

impl AgentInner {
    async fn swap_model(&self, client: Arc<dyn ModelClient>) {
        let mut model = self.model.write().await;
        tracing::info!(
            from = model.model_id(),
            to = client.model_id(),
            "Model client swapped"
        );
        *model = client;
    }
}

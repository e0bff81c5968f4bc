//! Bridge between the event hub and a host UI
//!
//! One relay worker per domain broker. Each worker wraps the domain event in
//! a `UiMessage` envelope and hands it to the UI's thread-safe injection
//! point. Workers translate and nothing else; deciding whether an event
//! belongs to the session on screen is the consumer's job.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::events::{AgentEvent, AuthEvent, TodoEvent, ToolEvent};
use crate::pubsub::{Event, EventHub, Subscription};

/// Envelope delivered to the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum UiMessage {
    Agent(Event<AgentEvent>),
    Tool(Event<ToolEvent>),
    Auth(Event<AuthEvent>),
    Todos(Event<TodoEvent>),
}

impl UiMessage {
    pub fn domain(&self) -> &'static str {
        match self {
            UiMessage::Agent(_) => "agent",
            UiMessage::Tool(_) => "tools",
            UiMessage::Auth(_) => "auth",
            UiMessage::Todos(_) => "todos",
        }
    }
}

/// Host UI message-injection entry point.
///
/// Called from relay workers, never from the UI thread, so implementations
/// must be thread-safe and must not block.
pub trait UiSink: Send + Sync {
    fn send(&self, message: UiMessage);
}

impl UiSink for mpsc::UnboundedSender<UiMessage> {
    fn send(&self, message: UiMessage) {
        // Receiver gone means the UI is shutting down
        let _ = mpsc::UnboundedSender::send(self, message);
    }
}

/// Create a channel-backed sink and the receiver a UI loop drains
pub fn create_ui_channel() -> (Arc<dyn UiSink>, mpsc::UnboundedReceiver<UiMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

/// Running relay workers for every hub domain
pub struct Bridge {
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl Bridge {
    /// Subscribe to every domain and spawn one relay worker per broker.
    ///
    /// Subscriptions are taken before this returns, so nothing published
    /// afterwards is missed. Must be called inside a tokio runtime.
    pub fn start(hub: &EventHub, sink: Arc<dyn UiSink>) -> Self {
        let token = hub.lifecycle().child_token();
        let telemetry = hub.telemetry();

        let workers = vec![
            spawn_relay(
                hub.agent().subscribe(),
                UiMessage::Agent,
                Arc::clone(&sink),
                token.clone(),
                telemetry.relay_span("agent"),
            ),
            spawn_relay(
                hub.tools().subscribe(),
                UiMessage::Tool,
                Arc::clone(&sink),
                token.clone(),
                telemetry.relay_span("tools"),
            ),
            spawn_relay(
                hub.auth().subscribe(),
                UiMessage::Auth,
                Arc::clone(&sink),
                token.clone(),
                telemetry.relay_span("auth"),
            ),
            spawn_relay(
                hub.todos().subscribe(),
                UiMessage::Todos,
                sink,
                token.clone(),
                telemetry.relay_span("todos"),
            ),
        ];

        tracing::debug!(workers = workers.len(), "Bridge started");
        Self { token, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_running(&self) -> bool {
        self.workers.iter().any(|w| !w.is_finished())
    }

    /// Cancel the shared token and wait for every relay worker to exit
    pub async fn stop(&mut self) {
        self.token.cancel();
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                tracing::warn!("Bridge relay worker failed: {}", e);
            }
        }
        tracing::debug!("Bridge stopped");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn spawn_relay<T, F>(
    mut subscription: Subscription<T>,
    wrap: F,
    sink: Arc<dyn UiSink>,
    token: CancellationToken,
    span: tracing::Span,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Fn(Event<T>) -> UiMessage + Send + 'static,
{
    tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = subscription.recv() => match event {
                        Some(event) => sink.send(wrap(event)),
                        None => break,
                    },
                }
            }
            tracing::trace!("Relay worker exiting");
        }
        .instrument(span),
    )
}

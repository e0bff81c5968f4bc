//! Per-domain event hub
//!
//! One broker per domain (agent, tools, auth, task list) behind a single
//! start/stop lifecycle. Built once at process startup and handed to the
//! agent and the bridge.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::broker::{Broker, EventType};
use crate::config::EngineConfig;
use crate::events::{AgentEvent, AgentEventKind, AuthEvent, TodoEvent, ToolEvent, ToolEventKind};
use crate::logging::Telemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HubState {
    Idle,
    Running,
    Stopped,
}

pub struct EventHub {
    agent: Broker<AgentEvent>,
    tools: Broker<ToolEvent>,
    auth: Broker<AuthEvent>,
    todos: Broker<TodoEvent>,
    lifecycle: CancellationToken,
    state: Mutex<HubState>,
    telemetry: Telemetry,
}

impl EventHub {
    pub fn new(buffer: usize, telemetry: Telemetry) -> Self {
        Self {
            agent: Broker::with_telemetry("agent", buffer, telemetry.clone()),
            tools: Broker::with_telemetry("tools", buffer, telemetry.clone()),
            auth: Broker::with_telemetry("auth", buffer, telemetry.clone()),
            todos: Broker::with_telemetry("todos", buffer, telemetry.clone()),
            lifecycle: CancellationToken::new(),
            state: Mutex::new(HubState::Idle),
            telemetry,
        }
    }

    /// Hub sized by `subscriber_buffer`
    pub fn from_config(config: &EngineConfig, telemetry: Telemetry) -> Self {
        Self::new(config.subscriber_buffer, telemetry)
    }

    /// Mark the hub running. Idempotent while running; a stopped hub cannot
    /// be restarted.
    pub fn start(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        match *state {
            HubState::Running => Ok(()),
            HubState::Idle => {
                *state = HubState::Running;
                tracing::info!(component = self.telemetry.component(), "Event hub started");
                Ok(())
            }
            HubState::Stopped => anyhow::bail!("Event hub was stopped and cannot be restarted"),
        }
    }

    /// Shut down every broker and cancel the lifecycle token.
    ///
    /// Subscribers drain what is queued and then see end-of-stream. Safe to
    /// call more than once.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if *state == HubState::Stopped {
                return;
            }
            *state = HubState::Stopped;
        }
        self.lifecycle.cancel();
        self.agent.shutdown();
        self.tools.shutdown();
        self.auth.shutdown();
        self.todos.shutdown();
        tracing::info!(
            component = self.telemetry.component(),
            dropped_events = self.telemetry.dropped_events(),
            "Event hub stopped"
        );
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock() == HubState::Running
    }

    /// Token cancelled when the hub stops; relay workers derive from it
    pub fn lifecycle(&self) -> CancellationToken {
        self.lifecycle.clone()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn agent(&self) -> &Broker<AgentEvent> {
        &self.agent
    }

    pub fn tools(&self) -> &Broker<ToolEvent> {
        &self.tools
    }

    pub fn auth(&self) -> &Broker<AuthEvent> {
        &self.auth
    }

    pub fn todos(&self) -> &Broker<TodoEvent> {
        &self.todos
    }

    pub fn publish_agent(&self, event: AgentEvent) {
        let topic = match event.kind {
            AgentEventKind::ToolCall { .. } | AgentEventKind::Summarized { .. } => {
                EventType::Created
            }
            _ => EventType::Updated,
        };
        self.agent.publish(topic, event);
    }

    pub fn publish_tool(&self, event: ToolEvent) {
        let topic = match event.kind {
            ToolEventKind::Started => EventType::Created,
            _ => EventType::Updated,
        };
        self.tools.publish(topic, event);
    }

    pub fn publish_auth(&self, event: AuthEvent) {
        self.auth.publish(EventType::Updated, event);
    }

    pub fn publish_todos(&self, event: TodoEvent) {
        self.todos.publish(EventType::Updated, event);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(crate::constants::events::SUBSCRIBER_BUFFER, Telemetry::default())
    }
}

//! Broker fan-out, hub lifecycle, and the UI bridge

mod common;

use std::time::Duration;

use convoy_core::bridge::create_ui_channel;
use convoy_core::events::{
    AgentEvent, AgentEventKind, AuthEvent, AuthEventKind, TodoEvent, ToolEvent, ToolEventKind,
};
use convoy_core::logging::Telemetry;
use convoy_core::{Bridge, Broker, EventHub, EventType, StreamCallbacks};

use common::*;

fn tool_event(call_id: &str) -> ToolEvent {
    ToolEvent {
        session_id: "s1".to_string(),
        call_id: call_id.to_string(),
        tool_name: "bash".to_string(),
        kind: ToolEventKind::Started,
        summary: "Running cargo fmt".to_string(),
        detail: None,
        duration_ms: None,
    }
}

#[tokio::test]
async fn slow_subscriber_does_not_hold_back_others() {
    let telemetry = Telemetry::new("test");
    let broker = Broker::with_telemetry("numbers", 4, telemetry.clone());
    let mut fast = broker.subscribe();
    let mut slow = broker.subscribe();

    let mut fast_seen = Vec::new();
    for n in 0..10u32 {
        broker.publish(EventType::Updated, n);
        fast_seen.extend(std::iter::from_fn(|| fast.try_recv()).map(|e| e.payload));
    }

    assert_eq!(fast_seen, (0..10).collect::<Vec<_>>());
    assert_eq!(drain(&mut slow), vec![0, 1, 2, 3]);
    assert_eq!(telemetry.dropped_events(), 6);

    // Still subscribed after overflowing
    broker.publish(EventType::Updated, 10);
    assert_eq!(drain(&mut slow), vec![10]);
}

#[tokio::test]
async fn dropped_subscription_is_removed() {
    let broker: Broker<u32> = Broker::new("numbers", 8);
    let first = broker.subscribe();
    let _second = broker.subscribe();
    assert_eq!(broker.subscriber_count(), 2);

    drop(first);
    assert_eq!(broker.subscriber_count(), 1);
    broker.publish(EventType::Created, 1);
}

#[tokio::test]
async fn hub_stop_ends_every_stream() {
    let hub = EventHub::default();
    hub.start().unwrap();
    let mut agent = hub.agent().subscribe();
    let mut todos = hub.todos().subscribe();

    hub.publish_agent(AgentEvent::new("s1", AgentEventKind::Cancelled));
    hub.stop();
    hub.stop();

    // Queued events drain before end-of-stream
    assert!(agent.recv().await.is_some());
    assert!(agent.recv().await.is_none());
    assert!(todos.recv().await.is_none());

    assert!(!hub.is_running());
    assert!(hub.start().is_err());
    hub.publish_todos(TodoEvent {
        session_id: "s1".to_string(),
        todos: Vec::new(),
    });
    assert!(hub.todos().subscribe().recv().await.is_none());
}

#[tokio::test]
async fn bridge_relays_each_domain_and_stops_promptly() {
    let hub = EventHub::default();
    hub.start().unwrap();
    let (sink, mut rx) = create_ui_channel();
    let mut bridge = Bridge::start(&hub, sink);
    assert_eq!(bridge.worker_count(), 4);

    hub.publish_agent(AgentEvent::new("s1", AgentEventKind::Cancelled));
    hub.publish_tool(tool_event("c1"));
    hub.publish_auth(AuthEvent::new("anthropic", AuthEventKind::Expiring, None));
    hub.publish_todos(TodoEvent {
        session_id: "s1".to_string(),
        todos: Vec::new(),
    });

    let mut domains = Vec::new();
    for _ in 0..4 {
        let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        domains.push(message.domain());
    }
    domains.sort();
    assert_eq!(domains, vec!["agent", "auth", "todos", "tools"]);

    tokio::time::timeout(Duration::from_secs(1), bridge.stop())
        .await
        .unwrap();
    assert!(!bridge.is_running());
    assert_eq!(hub.agent().subscriber_count(), 0);

    hub.publish_tool(tool_event("c2"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn agent_turn_reaches_the_ui_in_order() {
    let client = ScriptedClient::new("scripted", vec![calls(&[("a", "read")]), answer("done")]);
    let h = harness(client, RecordingTools::new());
    let (sink, mut rx) = create_ui_channel();
    let mut bridge = Bridge::start(&h.hub, sink);

    h.agent
        .send("s1", "go", &StreamCallbacks::default())
        .await
        .unwrap();

    let mut agent_kinds: Vec<AgentEventKind> = Vec::new();
    while agent_kinds.last().map_or(true, |k| !matches!(k, AgentEventKind::Complete { .. })) {
        let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if let convoy_core::UiMessage::Agent(event) = message {
            assert_eq!(event.payload.session_id, "s1");
            agent_kinds.push(event.payload.kind);
        }
    }

    assert!(matches!(agent_kinds[0], AgentEventKind::ToolCall { .. }));
    assert!(matches!(agent_kinds[1], AgentEventKind::ToolResult { .. }));
    assert!(matches!(agent_kinds[2], AgentEventKind::TextDelta { .. }));
    assert_eq!(agent_kinds.len(), 4);

    bridge.stop().await;
    h.hub.stop();
}

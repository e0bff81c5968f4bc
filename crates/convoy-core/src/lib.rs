//! Convoy core library
//!
//! The agent execution engine and its event-distribution substrate:
//! - `agent` - Conversational tool-calling loop (Send / Cancel / SetModel)
//! - `pubsub` - Generic publish/subscribe broker and the per-domain event hub
//! - `bridge` - Relays hub events into a host UI's message queue
//! - `storage` - SQLite persistence for sessions, messages, and credentials
//! - `auth` - Credential refresh boundary, OAuth refresh client, expiry monitor
//! - `ai` - Conversation data model and the model client boundary
//! - `tools` - Tool executor boundary and activity summaries

pub mod agent;
pub mod ai;
pub mod auth;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod paths;
pub mod pubsub;
pub mod storage;
pub mod tools;

pub use agent::{Agent, StreamCallbacks};
pub use bridge::{Bridge, UiMessage, UiSink};
pub use config::EngineConfig;
pub use error::{AgentError, ModelError};
pub use pubsub::{Broker, Event, EventHub, EventType, Subscription};

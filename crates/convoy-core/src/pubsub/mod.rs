//! Publish/subscribe substrate
//!
//! `Broker<T>` fans events out to bounded per-subscriber queues without ever
//! blocking the publisher. `EventHub` groups one broker per domain.

mod broker;
mod hub;

pub use broker::{Broker, Event, EventType, Subscription};
pub use hub::EventHub;

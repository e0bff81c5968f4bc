//! Generic publish/subscribe broker for one payload type.
//!
//! Each subscription owns a bounded queue. The broker keeps only the sending
//! half, so the queue lives exactly as long as the subscription that drains
//! it. Publishing never waits: when a subscriber's queue is full the event
//! being published is dropped for that subscriber, and everything already
//! queued is kept.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::logging::Telemetry;

/// What happened to the payload's subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
}

/// Published envelope; immutable after publish
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    pub topic: EventType,
    pub payload: T,
}

struct BrokerInner<T> {
    name: &'static str,
    buffer: usize,
    subscribers: Mutex<HashMap<u64, mpsc::Sender<Event<T>>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    telemetry: Telemetry,
}

/// Fan-out point for one payload type. Clones share subscribers.
pub struct Broker<T> {
    inner: Arc<BrokerInner<T>>,
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Broker<T> {
    pub fn new(name: &'static str, buffer: usize) -> Self {
        Self::with_telemetry(name, buffer, Telemetry::default())
    }

    pub fn with_telemetry(name: &'static str, buffer: usize, telemetry: Telemetry) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                name,
                buffer: buffer.max(1),
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                telemetry,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Create a subscription with its own bounded queue.
    ///
    /// Subscribing to a shut-down broker yields a subscription whose queue
    /// is already closed.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        // Checked under the lock so a concurrent shutdown cannot miss `tx`
        let mut subscribers = self.inner.subscribers.lock();
        if !self.inner.closed.load(Ordering::Acquire) {
            subscribers.insert(id, tx);
            tracing::debug!(broker = self.inner.name, subscription = id, "Subscribed");
        }
        drop(subscribers);

        Subscription {
            id,
            rx,
            broker: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver to every live subscription without waiting on any of them.
    ///
    /// A no-op with zero subscribers or after shutdown.
    pub fn publish(&self, topic: EventType, payload: T) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }

        let mut subscribers = self.inner.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }

        let event = Event { topic, payload };
        let mut gone = Vec::new();

        for (id, tx) in subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.inner.telemetry.record_dropped(self.inner.name);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => gone.push(*id),
            }
        }

        for id in gone {
            subscribers.remove(&id);
            tracing::debug!(broker = self.inner.name, subscription = id, "Pruned closed subscription");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Close every queue and refuse further publishes and subscriptions.
    ///
    /// Subscribers drain what is already queued, then `recv` returns `None`.
    pub fn shutdown(&self) {
        let mut subscribers = self.inner.subscribers.lock();
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = std::mem::take(&mut *subscribers);
        drop(subscribers);
        tracing::debug!(
            broker = self.inner.name,
            subscriptions = dropped.len(),
            "Broker shut down"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

/// Consumer-owned handle on a broker.
///
/// Dropping it unsubscribes; the broker only holds the sending half.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::Receiver<Event<T>>,
    broker: Weak<BrokerInner<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next event, or `None` once unsubscribed or the broker shut down and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Event<T>> {
        self.rx.recv().await
    }

    /// Next queued event without waiting
    pub fn try_recv(&mut self) -> Option<Event<T>> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving. Already-queued events stay readable.
    pub fn unsubscribe(&mut self) {
        self.rx.close();
        if let Some(inner) = self.broker.upgrade() {
            inner.subscribers.lock().remove(&self.id);
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Event<T>> {
        futures::stream::unfold(self, |mut sub| async move {
            let event = sub.recv().await?;
            Some((event, sub))
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.broker.upgrade() {
            inner.subscribers.lock().remove(&self.id);
        }
    }
}

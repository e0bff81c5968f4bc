//! Per-session mutual exclusion for turns

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per session id, created on first use and dropped once
/// no turn holds or waits on it.
#[derive(Default)]
pub(crate) struct SessionGates {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionGates {
    /// Wait until `session_id` is free and take it
    pub(crate) async fn acquire(&self, session_id: &str) -> SessionPermit<'_> {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        SessionPermit {
            gates: self,
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    pub(crate) fn is_busy(&self, session_id: &str) -> bool {
        self.locks
            .get(session_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Held for the duration of one turn
pub(crate) struct SessionPermit<'a> {
    gates: &'a SessionGates,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionPermit<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's reference left: no turn holds or waits on it
        self.gates
            .locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

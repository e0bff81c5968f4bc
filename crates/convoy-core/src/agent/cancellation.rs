//! Cancellation tokens for in-flight turns, keyed by session

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub(crate) struct CancellationRegistry {
    active: DashMap<String, CancellationToken>,
}

impl CancellationRegistry {
    /// Register a fresh token for the turn now owning `session_id`.
    ///
    /// The returned guard unregisters it when the turn ends.
    pub(crate) fn begin(&self, session_id: &str) -> ActiveTurn<'_> {
        let token = CancellationToken::new();
        self.active.insert(session_id.to_string(), token.clone());
        ActiveTurn {
            registry: self,
            session_id: session_id.to_string(),
            token,
        }
    }

    /// Cancel the in-flight turn, if any. Returns whether one was running.
    pub(crate) fn cancel(&self, session_id: &str) -> bool {
        // Clone out so the shard lock is not held while waking waiters
        let token = self.active.get(session_id).map(|t| t.clone());
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn sessions(&self) -> Vec<String> {
        self.active.iter().map(|e| e.key().clone()).collect()
    }
}

pub(crate) struct ActiveTurn<'a> {
    registry: &'a CancellationRegistry,
    session_id: String,
    token: CancellationToken,
}

impl ActiveTurn<'_> {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for ActiveTurn<'_> {
    fn drop(&mut self) {
        self.registry.active.remove(&self.session_id);
    }
}

//! Credential expiry monitor
//!
//! Periodically reads stored credentials and publishes `expiring` and
//! `expired` auth events. Each provider's state is reported once; a changed
//! expiry (for example after a refresh) resets it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::constants;
use crate::events::{AuthEvent, AuthEventKind};
use crate::pubsub::EventHub;
use crate::storage::FileCredentials;

type Reported = (AuthEventKind, Option<DateTime<Utc>>);

pub struct CredentialMonitor {
    credentials: Arc<FileCredentials>,
    hub: Arc<EventHub>,
    warning: chrono::Duration,
    interval: Duration,
    reported: Mutex<HashMap<String, Reported>>,
}

impl CredentialMonitor {
    pub fn new(credentials: Arc<FileCredentials>, hub: Arc<EventHub>) -> Self {
        Self {
            credentials,
            hub,
            warning: chrono::Duration::seconds(constants::auth::EXPIRY_WARNING_SECS),
            interval: Duration::from_secs(constants::auth::MONITOR_INTERVAL_SECS),
            reported: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_warning(mut self, warning: chrono::Duration) -> Self {
        self.warning = warning;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Inspect every stored credential once and publish state changes.
    ///
    /// Returns the events published.
    pub fn check_once(&self, now: DateTime<Utc>) -> Result<Vec<AuthEvent>> {
        let store = self.credentials.load_all()?;
        let mut reported = self.reported.lock();
        let mut published = Vec::new();

        for (provider_id, credential) in store.providers() {
            let Some(kind) = credential.expiry_status(now, self.warning) else {
                reported.remove(provider_id);
                continue;
            };

            let state = (kind, credential.expires_at);
            if reported.get(provider_id) == Some(&state) {
                continue;
            }
            reported.insert(provider_id.to_string(), state);

            let event = AuthEvent::new(provider_id, kind, credential.expires_at);
            tracing::info!(provider = provider_id, ?kind, "Credential expiry state changed");
            self.hub.publish_auth(event.clone());
            published.push(event);
        }

        Ok(published)
    }

    /// Run `check_once` on an interval until the token is cancelled
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.check_once(Utc::now()) {
                            tracing::warn!("Credential monitor check failed: {}", e);
                        }
                    }
                }
            }
            tracing::debug!("Credential monitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, CredentialPersistence};
    use tempfile::TempDir;

    fn setup() -> (Arc<FileCredentials>, Arc<EventHub>, TempDir) {
        let temp = TempDir::new().unwrap();
        let creds = Arc::new(FileCredentials::new(temp.path().join("credentials.json")));
        (creds, Arc::new(EventHub::default()), temp)
    }

    fn expiring_in(minutes: i64) -> Credential {
        Credential {
            access_token: "tok".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: Some(Utc::now() + chrono::Duration::minutes(minutes)),
        }
    }

    #[tokio::test]
    async fn reports_each_state_once() {
        let (creds, hub, _temp) = setup();
        let mut sub = hub.auth().subscribe();
        creds.persist("anthropic", &expiring_in(2)).unwrap();
        creds.persist("openai", &expiring_in(600)).unwrap();

        let monitor = CredentialMonitor::new(creds.clone(), hub.clone());
        let first = monitor.check_once(Utc::now()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].provider_id, "anthropic");
        assert_eq!(first[0].kind, AuthEventKind::Expiring);
        assert!(monitor.check_once(Utc::now()).unwrap().is_empty());

        let later = Utc::now() + chrono::Duration::minutes(3);
        let second = monitor.check_once(later).unwrap();
        assert_eq!(second[0].kind, AuthEventKind::Expired);

        assert_eq!(sub.recv().await.unwrap().payload.kind, AuthEventKind::Expiring);
        assert_eq!(sub.recv().await.unwrap().payload.kind, AuthEventKind::Expired);
    }

    #[tokio::test]
    async fn refreshed_credential_clears_state() {
        let (creds, hub, _temp) = setup();
        creds.persist("anthropic", &expiring_in(1)).unwrap();
        let monitor = CredentialMonitor::new(creds.clone(), hub);
        assert_eq!(monitor.check_once(Utc::now()).unwrap().len(), 1);

        creds.persist("anthropic", &expiring_in(120)).unwrap();
        assert!(monitor.check_once(Utc::now()).unwrap().is_empty());

        creds.persist("anthropic", &expiring_in(1)).unwrap();
        assert_eq!(monitor.check_once(Utc::now()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn spawned_monitor_stops_on_cancel() {
        let (creds, hub, _temp) = setup();
        let monitor = Arc::new(
            CredentialMonitor::new(creds, hub).with_interval(Duration::from_millis(10)),
        );
        let token = CancellationToken::new();
        let handle = monitor.spawn(token.clone());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

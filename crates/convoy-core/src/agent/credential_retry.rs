//! One-shot credential recovery after an authentication failure.
//!
//! Recovery is two explicit steps run in order:
//! 1. `refresh_and_persist`: obtain a fresh credential and make it durable.
//! 2. The agent swaps in a client built from the persisted credential.
//!
//! Providers that rotate refresh tokens invalidate the old one the moment a
//! new access token is issued, so step 1 must complete before step 2 starts.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::ai::ModelClient;
use crate::auth::{Credential, CredentialPersistence, CredentialRefresher};

/// Builds a model client around a credential
pub type ClientFactory =
    Arc<dyn Fn(&Credential) -> Result<Arc<dyn ModelClient>> + Send + Sync>;

/// Collaborators for recovering from an authentication failure
#[derive(Clone)]
pub struct CredentialRecovery {
    provider_id: String,
    refresher: Arc<dyn CredentialRefresher>,
    persistence: Arc<dyn CredentialPersistence>,
    factory: ClientFactory,
}

impl CredentialRecovery {
    pub fn new(
        provider_id: impl Into<String>,
        refresher: Arc<dyn CredentialRefresher>,
        persistence: Arc<dyn CredentialPersistence>,
        factory: ClientFactory,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            refresher,
            persistence,
            factory,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Refresh the stored credential and persist the result.
    ///
    /// Returns only once the new credential is durable.
    pub(crate) async fn refresh_and_persist(&self) -> Result<Credential> {
        let current = self
            .persistence
            .load(&self.provider_id)
            .context("Failed to load stored credential")?;

        let fresh = self
            .refresher
            .refresh(&self.provider_id, current)
            .await
            .context("Credential refresh rejected")?;

        self.persistence
            .persist(&self.provider_id, &fresh)
            .context("Failed to persist refreshed credential")?;

        Ok(fresh)
    }

    pub(crate) fn build_client(&self, credential: &Credential) -> Result<Arc<dyn ModelClient>> {
        (self.factory)(credential).context("Failed to build client from refreshed credential")
    }
}

impl std::fmt::Debug for CredentialRecovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecovery")
            .field("provider_id", &self.provider_id)
            .finish_non_exhaustive()
    }
}

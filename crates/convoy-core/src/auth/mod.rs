//! Credential lifecycle
//!
//! The agent's credential retry talks to two collaborators: a
//! `CredentialRefresher` that exchanges a refresh token for a new credential,
//! and a `CredentialPersistence` that makes the result durable. They are kept
//! separate so persisting always happens as its own step, before any client
//! is rebuilt from the new credential.

mod monitor;
mod oauth;

pub use monitor::CredentialMonitor;
pub use oauth::{OAuthConfig, OAuthRefresher, TokenResponse};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::events::AuthEventKind;

/// OAuth access credential for one provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Expired, expiring within `warning`, or fine (`None`)
    pub fn expiry_status(&self, now: DateTime<Utc>, warning: Duration) -> Option<AuthEventKind> {
        let expires_at = self.expires_at?;
        if expires_at <= now {
            Some(AuthEventKind::Expired)
        } else if expires_at - now <= warning {
            Some(AuthEventKind::Expiring)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Exchanges a refresh credential for a new one.
///
/// The caller persists the result before using it: providers that rotate
/// refresh tokens invalidate the old one as soon as a new access token is
/// issued.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self, provider_id: &str, current: Option<Credential>) -> Result<Credential>;
}

/// Durable credential storage
pub trait CredentialPersistence: Send + Sync {
    fn load(&self, provider_id: &str) -> Result<Option<Credential>>;

    /// Must be durable when this returns
    fn persist(&self, provider_id: &str, credential: &Credential) -> Result<()>;
}

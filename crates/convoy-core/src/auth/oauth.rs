//! OAuth refresh-token client
//!
//! Posts a `refresh_token` grant to the provider's token endpoint and turns
//! the response into a `Credential`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Credential, CredentialRefresher};

/// Token endpoint settings for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub token_endpoint: String,
    pub client_id: String,
    /// Extra headers some providers require on the token request
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Build the credential to store.
    ///
    /// Providers that don't rotate omit `refresh_token`; the previous one
    /// stays valid and is carried over.
    pub fn into_credential(self, previous_refresh: Option<String>) -> Credential {
        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self.expires_in.and_then(expires_at),
        }
    }
}

/// Absolute expiry for a lifetime in seconds; `None` when it does not fit
fn expires_at(secs: u64) -> Option<DateTime<Utc>> {
    let lifetime = i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)?;
    Utc::now().checked_add_signed(lifetime)
}

pub struct OAuthRefresher {
    http_client: Client,
    config: OAuthConfig,
}

impl OAuthRefresher {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("Convoy/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Exchange a refresh token for a new token set
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let request_body = serde_json::json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
            "client_id": self.config.client_id,
        });

        let mut request = self
            .http_client
            .post(&self.config.token_endpoint)
            .header("Content-Type", "application/json");
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.json(&request_body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Token refresh failed ({}): {}", status, error_text));
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens)
    }
}

#[async_trait]
impl CredentialRefresher for OAuthRefresher {
    async fn refresh(&self, provider_id: &str, current: Option<Credential>) -> Result<Credential> {
        let refresh_token = current
            .and_then(|c| c.refresh_token)
            .ok_or_else(|| anyhow!("No refresh token stored for {}", provider_id))?;

        tracing::info!(provider = provider_id, "Refreshing OAuth credential");
        let tokens = self.refresh_token(&refresh_token).await?;
        Ok(tokens.into_credential(Some(refresh_token)))
    }
}

//! Engine error types
//!
//! `ModelError` is what a model client surfaces; it keeps authentication
//! failures distinguishable from malformed requests so the agent can decide
//! whether a credential refresh is worth attempting. `AgentError` is what a
//! turn reports through the error callback and the error event.

use thiserror::Error;

/// Failure reported by a model client, either when opening a stream or mid-stream.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Credential rejected (HTTP 401)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Credential accepted but not allowed (HTTP 403)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Request rejected as malformed (HTTP 400). Never retried.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("provider error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no stream data received for {0} seconds")]
    Timeout(u64),

    #[error("stream error: {0}")]
    Stream(String),
}

impl ModelError {
    /// Whether this failure should trigger the one-shot credential retry.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Forbidden(_))
    }

    /// Map an HTTP status from a provider response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Self::BadRequest(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            429 => Self::RateLimited(message),
            _ => Self::Server { status, message },
        }
    }
}

/// Failure that ends a Send or Summarize.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Conversation store write or read failed; fatal to the turn.
    #[error("conversation store failure: {0:#}")]
    Store(#[source] anyhow::Error),

    #[error("stopped after {0} model turns without a final answer")]
    MaxTurnsExceeded(usize),

    #[error("credential refresh failed: {0}")]
    CredentialRefresh(String),

    /// Summarize got no text back; the session's summary is left as it was.
    #[error("model returned an empty summary")]
    EmptySummary,

    /// Returned from Send when the turn was cancelled. Not an error event.
    #[error("turn cancelled")]
    Cancelled,
}

impl AgentError {
    pub(crate) fn store(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}

//! Persistence layer
//!
//! SQLite-based storage for:
//! - Session metadata (title, message count, summary pointer)
//! - The append-only message log per session
//!
//! plus a JSON file for OAuth credentials.

use anyhow::Result;
use chrono::{DateTime, Utc};

pub mod credentials;
mod database;
mod messages;
mod sessions;

pub use credentials::{CredentialStore, FileCredentials};
pub use database::Database;
pub use messages::MessageStore;
pub use sessions::{SessionInfo, SessionManager};

use crate::ai::Message;

/// Conversation store the agent depends on.
///
/// `append_message` must be atomic and durable when it returns; the agent
/// publishes the matching event only afterwards.
pub trait ConversationStore: Send + Sync {
    fn create_session(&self, title: &str) -> Result<SessionInfo>;

    /// Get the session, creating an untitled one if the id is new
    fn ensure_session(&self, session_id: &str) -> Result<SessionInfo>;

    fn get_session(&self, session_id: &str) -> Result<Option<SessionInfo>>;

    fn list_sessions(&self) -> Result<Vec<SessionInfo>>;

    fn update_title(&self, session_id: &str, title: &str) -> Result<()>;

    fn set_summary_message(&self, session_id: &str, message_id: &str) -> Result<()>;

    /// Returns false if there was no such session
    fn delete_session(&self, session_id: &str) -> Result<bool>;

    fn append_message(&self, message: &Message) -> Result<()>;

    /// Read snapshot of the log; may be stale by the time it is used
    fn list_messages(&self, session_id: &str) -> Result<Vec<Message>>;
}

/// `ConversationStore` over the SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    sessions: SessionManager,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self {
            sessions: SessionManager::new(db),
        }
    }

    pub fn db(&self) -> &Database {
        self.sessions.db()
    }
}

impl ConversationStore for SqliteStore {
    fn create_session(&self, title: &str) -> Result<SessionInfo> {
        self.sessions.create_session(title)
    }

    fn ensure_session(&self, session_id: &str) -> Result<SessionInfo> {
        self.sessions.ensure_session(session_id)
    }

    fn get_session(&self, session_id: &str) -> Result<Option<SessionInfo>> {
        self.sessions.get_session(session_id)
    }

    fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        self.sessions.list_sessions()
    }

    fn update_title(&self, session_id: &str, title: &str) -> Result<()> {
        self.sessions.update_session_title(session_id, title)
    }

    fn set_summary_message(&self, session_id: &str, message_id: &str) -> Result<()> {
        self.sessions.set_summary_message(session_id, message_id)
    }

    fn delete_session(&self, session_id: &str) -> Result<bool> {
        self.sessions.delete_session(session_id)
    }

    fn append_message(&self, message: &Message) -> Result<()> {
        MessageStore::new(self.db()).append_message(message)
    }

    fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        MessageStore::new(self.db()).load_session_messages(session_id)
    }
}

/// Parse a stored RFC 3339 timestamp, falling back to now on corruption
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

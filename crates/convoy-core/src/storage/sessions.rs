//! Session CRUD operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::Database;
use super::parse_timestamp;
use crate::constants;

/// Session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    /// Message the model's history starts from, once summarized
    pub summary_message_id: Option<String>,
}

/// Session manager for CRUD operations
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
}

const SESSION_COLUMNS: &str =
    "id, title, created_at, updated_at, message_count, summary_message_id";

impl SessionManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Create a session with a fresh id
    pub fn create_session(&self, title: &str) -> Result<SessionInfo> {
        let id = uuid::Uuid::new_v4().to_string();
        self.create_session_with_id(&id, title)
    }

    /// Create a session under a caller-chosen id
    pub fn create_session_with_id(&self, id: &str, title: &str) -> Result<SessionInfo> {
        let now = Utc::now();
        let stamp = now.to_rfc3339();

        self.db.conn().execute(
            "INSERT INTO sessions (id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, title, stamp, stamp],
        )?;

        tracing::debug!(session_id = %id, "Session created");
        Ok(SessionInfo {
            id: id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            message_count: 0,
            summary_message_id: None,
        })
    }

    /// Fetch the session, creating it with an empty title if it is new
    pub fn ensure_session(&self, id: &str) -> Result<SessionInfo> {
        if let Some(session) = self.get_session(id)? {
            return Ok(session);
        }
        let stamp = Utc::now().to_rfc3339();
        self.db.conn().execute(
            "INSERT OR IGNORE INTO sessions (id, title, created_at, updated_at)
             VALUES (?1, '', ?2, ?3)",
            params![id, stamp, stamp],
        )?;
        self.get_session(id)?
            .ok_or_else(|| anyhow::anyhow!("Session {} vanished after insert", id))
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionInfo>> {
        let sql = format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS);
        let session = self
            .db
            .conn()
            .query_row(&sql, [session_id], Self::map_session_row)
            .optional()?;
        Ok(session)
    }

    /// All sessions, most recently updated first
    pub fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let sql = format!(
            "SELECT {} FROM sessions ORDER BY updated_at DESC",
            SESSION_COLUMNS
        );
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&sql)?;
        let sessions = stmt
            .query_map([], Self::map_session_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn map_session_row(row: &rusqlite::Row) -> rusqlite::Result<SessionInfo> {
        let created_at: String = row.get(2)?;
        let updated_at: String = row.get(3)?;
        let message_count: i64 = row.get(4)?;

        Ok(SessionInfo {
            id: row.get(0)?,
            title: row.get(1)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
            message_count: message_count.max(0) as usize,
            summary_message_id: row.get(5)?,
        })
    }

    pub fn update_session_title(&self, session_id: &str, title: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let affected = self.db.conn().execute(
            "UPDATE sessions SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, now, session_id],
        )?;
        if affected == 0 {
            anyhow::bail!("Session not found: {}", session_id);
        }
        Ok(())
    }

    /// Point the session's model history at a summary message
    pub fn set_summary_message(&self, session_id: &str, message_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let affected = self.db.conn().execute(
            "UPDATE sessions SET summary_message_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![message_id, now, session_id],
        )?;
        if affected == 0 {
            anyhow::bail!("Session not found: {}", session_id);
        }
        Ok(())
    }

    /// Delete a session and all its messages
    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        // Messages go via ON DELETE CASCADE
        let affected = self
            .db
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;

        if affected > 0 {
            tracing::info!(session_id = %session_id, "Session deleted from database");
        }
        Ok(affected > 0)
    }

    /// Title from the first line of a prompt, cut at a word boundary
    pub fn generate_title_from_content(content: &str) -> String {
        let max = constants::session::MAX_TITLE_CHARS;
        let first_line = content.lines().next().unwrap_or("").trim();

        // Count chars (not bytes) for UTF-8 safety
        if first_line.chars().count() <= max {
            return first_line.to_string();
        }

        let head: String = first_line.chars().take(max).collect();
        if let Some(last_space) = head.rfind(char::is_whitespace) {
            let char_idx = head[..last_space].chars().count();
            // Only use the word boundary if it keeps a meaningful prefix
            if char_idx > 20 {
                let prefix: String = first_line.chars().take(char_idx).collect();
                return format!("{}...", prefix.trim_end());
            }
        }

        let truncated: String = first_line.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

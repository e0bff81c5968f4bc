//! Message persistence storage
//!
//! Messages are append-only. Parts are stored as JSON for full fidelity.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::params;

use super::database::Database;
use super::parse_timestamp;
use crate::ai::{Message, Part, Role};

/// Message persistence store
pub struct MessageStore<'a> {
    db: &'a Database,
}

impl<'a> MessageStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append a message and bump the session's count and timestamp in one
    /// transaction. Fails if the session does not exist.
    pub fn append_message(&self, message: &Message) -> Result<()> {
        let parts_json =
            serde_json::to_string(&message.parts).context("Failed to serialize message parts")?;
        let now = Utc::now().to_rfc3339();

        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let affected = tx.execute(
            "UPDATE sessions SET message_count = message_count + 1, updated_at = ?1
             WHERE id = ?2",
            params![now, message.session_id],
        )?;
        if affected == 0 {
            anyhow::bail!("Session not found: {}", message.session_id);
        }

        tx.execute(
            "INSERT INTO messages (id, session_id, role, parts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.session_id,
                message.role.as_str(),
                parts_json,
                message.created_at.to_rfc3339()
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// All messages for a session in insertion order
    pub fn load_session_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, parts, created_at
             FROM messages WHERE session_id = ?1 ORDER BY seq",
        )?;

        let rows = stmt
            .query_map([session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, session_id, role, parts, created_at)| {
                let role: Role = role.parse()?;
                let parts: Vec<Part> = serde_json::from_str(&parts)
                    .with_context(|| format!("Corrupt parts in message {}", id))?;
                Ok(Message {
                    id,
                    session_id,
                    role,
                    parts,
                    created_at: parse_timestamp(&created_at),
                })
            })
            .collect()
    }

    pub fn get_message_count(&self, session_id: &str) -> Result<usize> {
        let count: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }
}

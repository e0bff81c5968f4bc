//! SQLite connection and schema migrations

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 1;

/// Shared handle to the SQLite database. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database file and run migrations
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Lock the connection for a statement or transaction
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
             id TEXT PRIMARY KEY,
             title TEXT NOT NULL DEFAULT '',
             created_at TEXT NOT NULL,
             updated_at TEXT NOT NULL,
             message_count INTEGER NOT NULL DEFAULT 0,
             summary_message_id TEXT
         );

         CREATE TABLE IF NOT EXISTS messages (
             seq INTEGER PRIMARY KEY AUTOINCREMENT,
             id TEXT NOT NULL UNIQUE,
             session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
             role TEXT NOT NULL,
             parts TEXT NOT NULL,
             created_at TEXT NOT NULL
         );

         CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, seq);
         CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at);",
    )
    .context("Failed to create schema")?;

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tracing::debug!(version = SCHEMA_VERSION, "Database schema migrated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_database_migrates_once() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("nested").join("convoy.db");

        let db = Database::new(&path).expect("Failed to open database");
        assert_eq!(db.path(), Some(path.as_path()));
        drop(db);

        let db = Database::new(&path).expect("Failed to reopen database");
        let version: i32 = db
            .conn()
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .expect("Failed to read version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let db = Database::open_in_memory().expect("Failed to open database");
        let result = db.conn().execute(
            "INSERT INTO messages (id, session_id, role, parts, created_at)
             VALUES ('m1', 'missing', 'user', '[]', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}

//! `convoy sessions` - read and delete stored conversations

use anyhow::{bail, Result};
use chrono::{DateTime, Local, Utc};
use clap::Subcommand;

use convoy_core::ai::{Message, Part};
use convoy_core::storage::{ConversationStore, Database, SqliteStore};
use convoy_core::EngineConfig;

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List sessions, most recently updated first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print a session's message log
    Show {
        id: String,

        /// Print JSON instead of a transcript
        #[arg(long)]
        json: bool,
    },

    /// Delete a session and all of its messages
    Delete { id: String },
}

pub fn run(action: SessionsAction, config: &EngineConfig) -> Result<()> {
    let db_path = config.database_path();
    let store = SqliteStore::new(Database::new(&db_path)?);
    tracing::debug!(database = %db_path.display(), "Opened session store");

    match action {
        SessionsAction::List { json } => list(&store, json),
        SessionsAction::Show { id, json } => show(&store, &id, json),
        SessionsAction::Delete { id } => delete(&store, &id),
    }
}

fn list(store: &SqliteStore, json: bool) -> Result<()> {
    let sessions = store.list_sessions()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions");
        return Ok(());
    }

    println!("{:<38} {:>5}  {:<16}  TITLE", "ID", "MSGS", "UPDATED");
    for session in sessions {
        let title = if session.title.is_empty() {
            "(untitled)"
        } else {
            session.title.as_str()
        };
        println!(
            "{:<38} {:>5}  {:<16}  {}",
            session.id,
            session.message_count,
            local_time(session.updated_at),
            title
        );
    }
    Ok(())
}

fn show(store: &SqliteStore, id: &str, json: bool) -> Result<()> {
    let Some(session) = store.get_session(id)? else {
        bail!("Session not found: {}", id);
    };
    let messages = store.list_messages(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    println!("{} ({})", session.title, session.id);
    println!(
        "created {}, {} messages",
        local_time(session.created_at),
        session.message_count
    );
    for message in &messages {
        let marker = if session.summary_message_id.as_deref() == Some(message.id.as_str()) {
            " [summary]"
        } else {
            ""
        };
        println!();
        println!("--- {}{} ---", message.role, marker);
        print_parts(message);
    }
    Ok(())
}

fn print_parts(message: &Message) {
    for part in &message.parts {
        match part {
            Part::Text { text } => println!("{}", text),
            Part::Reasoning { reasoning } => println!("(thinking) {}", reasoning),
            Part::ToolCall { id, name, input } => println!("-> {} [{}] {}", name, id, input),
            Part::ToolResult {
                tool_call_id,
                content,
                is_error,
                ..
            } => {
                let status = if *is_error { "error" } else { "ok" };
                let first = content.lines().next().unwrap_or("");
                println!("<- [{}] {}: {}", tool_call_id, status, first);
            }
        }
    }
}

fn delete(store: &SqliteStore, id: &str) -> Result<()> {
    if !store.delete_session(id)? {
        bail!("Session not found: {}", id);
    }
    tracing::info!(session_id = %id, "Session deleted");
    println!("Deleted session {}", id);
    Ok(())
}

fn local_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

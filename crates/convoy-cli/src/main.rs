//! Convoy - operator CLI for the agent engine's local state
//!
//! Inspects what the engine persisted:
//! - `convoy sessions` - list, show, or delete stored conversations
//! - `convoy config` - locate or print the effective engine configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use convoy_core::{logging, EngineConfig};

mod config_cmd;
mod sessions;

/// Convoy - agent engine session tooling
#[derive(Parser)]
#[command(name = "convoy")]
#[command(about = "Inspect and manage Convoy sessions", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.convoy/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stored conversation sessions
    Sessions {
        #[command(subcommand)]
        action: sessions::SessionsAction,
    },

    /// Engine configuration
    Config {
        #[command(subcommand)]
        action: config_cmd::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(convoy_core::paths::config_path);
    let config = EngineConfig::load_from_path(&config_path)?;

    // Logs go to a file so command output stays clean
    if let Err(e) = logging::init_file_logging(&config.logs_dir(), &config.log_level) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }
    tracing::info!(config = %config_path.display(), "convoy CLI started");

    match cli.command {
        Commands::Sessions { action } => sessions::run(action, &config),
        Commands::Config { action } => config_cmd::run(action, &config, &config_path),
    }
}

//! Engine configuration
//!
//! Loaded from `~/.convoy/config.toml`. Every field has a default, so a
//! missing file or a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::paths;

/// Tunables for the agent loop, event hub, and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap on model turns per Send; guards runaway tool-call chains
    pub max_turns: usize,
    /// Queue depth for each broker subscription
    pub subscriber_buffer: usize,
    /// Seconds without stream data before a model turn fails
    pub stream_timeout_secs: u64,
    /// Tool output is truncated past this many characters
    pub max_tool_output_chars: usize,
    /// Run the tool calls of one model turn concurrently
    pub parallel_tool_calls: bool,
    /// System prompt sent with every model request
    pub system_prompt: Option<String>,
    /// Default tracing level when RUST_LOG is unset
    pub log_level: String,
    /// Overrides ~/.convoy for database, credentials, and logs
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: constants::agent::MAX_TURNS,
            subscriber_buffer: constants::events::SUBSCRIBER_BUFFER,
            stream_timeout_secs: constants::agent::STREAM_TIMEOUT_SECS,
            max_tool_output_chars: constants::agent::MAX_TOOL_OUTPUT_CHARS,
            parallel_tool_calls: false,
            system_prompt: None,
            log_level: "info".to_string(),
            data_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load from the default config path, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from_path(&paths::config_path())
    }

    /// Load from a specific path; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: EngineConfig = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    /// Root directory for database, credentials, and logs
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(paths::config_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(constants::paths::DATABASE_FILE_NAME)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir()
            .join("tokens")
            .join(constants::paths::CREDENTIALS_FILE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }
}

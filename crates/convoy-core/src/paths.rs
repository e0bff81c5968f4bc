//! Centralized path utilities
//!
//! All application paths in one place for consistency

use std::path::PathBuf;

use crate::constants::paths;

/// Get the convoy config directory (~/.convoy)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(paths::CONFIG_DIR_NAME)
}

/// Get the config file (~/.convoy/config.toml)
pub fn config_path() -> PathBuf {
    config_dir().join(paths::CONFIG_FILE_NAME)
}

/// Get the logs directory (~/.convoy/logs)
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Get the tokens directory (~/.convoy/tokens)
pub fn tokens_dir() -> PathBuf {
    config_dir().join("tokens")
}

/// Get the credentials file (~/.convoy/tokens/credentials.json)
pub fn credentials_path() -> PathBuf {
    tokens_dir().join(paths::CREDENTIALS_FILE_NAME)
}

/// Get the session database (~/.convoy/convoy.db)
pub fn database_path() -> PathBuf {
    config_dir().join(paths::DATABASE_FILE_NAME)
}

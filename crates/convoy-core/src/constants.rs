//! Centralized constants

/// Agent loop limits and timeouts
pub mod agent {
    /// Default cap on model turns per Send
    pub const MAX_TURNS: usize = 50;
    /// Seconds without stream data before a model turn is abandoned
    pub const STREAM_TIMEOUT_SECS: u64 = 120;
    /// Tool output longer than this is truncated before it reaches history
    pub const MAX_TOOL_OUTPUT_CHARS: usize = 30_000;
    /// Prompt used by `Agent::summarize`
    pub const SUMMARY_PROMPT: &str = "Summarize the conversation so far. Capture the goal, \
        decisions made, files touched, and any unfinished work, so the conversation can \
        continue from this summary alone.";
}

/// Event distribution
pub mod events {
    /// Default per-subscriber queue depth
    pub const SUBSCRIBER_BUFFER: usize = 64;
}

/// Credential handling
pub mod auth {
    /// A credential this close to expiry is reported as expiring
    pub const EXPIRY_WARNING_SECS: i64 = 300;
    /// How often the credential monitor re-reads the store
    pub const MONITOR_INTERVAL_SECS: u64 = 60;
}

/// Session metadata
pub mod session {
    /// Maximum characters in a generated session title
    pub const MAX_TITLE_CHARS: usize = 50;
}

/// On-disk layout
pub mod paths {
    pub const CONFIG_DIR_NAME: &str = ".convoy";
    pub const CONFIG_FILE_NAME: &str = "config.toml";
    pub const DATABASE_FILE_NAME: &str = "convoy.db";
    pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";
    pub const LOG_FILE_NAME: &str = "convoy.log";
}

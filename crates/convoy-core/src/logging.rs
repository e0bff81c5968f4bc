//! Logging setup and the telemetry handle
//!
//! `init_file_logging` installs the process-wide tracing subscriber (file
//! output, no ANSI, `RUST_LOG` aware). It is called once by the binary.
//!
//! `Telemetry` is the handle engine components receive explicitly. It owns
//! the span naming for turns and the counters for events dropped on slow
//! subscribers, so nothing in the engine reaches for a global logger.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::constants;

/// Install a file-backed tracing subscriber.
///
/// Returns the log file path. Fails if a global subscriber is already set.
pub fn init_file_logging(log_dir: &Path, default_level: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join(constants::paths::LOG_FILE_NAME);
    let log_file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(log_path)
}

/// Explicitly passed logging/telemetry handle.
///
/// Cheap to clone; clones share counters.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<TelemetryInner>,
}

struct TelemetryInner {
    component: String,
    dropped_events: AtomicU64,
    turns_started: AtomicU64,
}

impl Telemetry {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                component: component.into(),
                dropped_events: AtomicU64::new(0),
                turns_started: AtomicU64::new(0),
            }),
        }
    }

    pub fn component(&self) -> &str {
        &self.inner.component
    }

    /// Span that scopes all logging for one Send on one session.
    pub fn turn_span(&self, session_id: &str) -> tracing::Span {
        self.inner.turns_started.fetch_add(1, Ordering::Relaxed);
        tracing::info_span!(
            "turn",
            component = %self.inner.component,
            session_id = %session_id
        )
    }

    /// Span for a bridge relay worker.
    pub fn relay_span(&self, domain: &'static str) -> tracing::Span {
        tracing::debug_span!("relay", component = %self.inner.component, domain)
    }

    /// Record an event dropped because a subscriber's queue was full.
    pub fn record_dropped(&self, broker: &str) {
        let total = self.inner.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(broker, total, "Subscriber queue full, dropping newest event");
    }

    pub fn dropped_events(&self) -> u64 {
        self.inner.dropped_events.load(Ordering::Relaxed)
    }

    pub fn turns_started(&self) -> u64 {
        self.inner.turns_started.load(Ordering::Relaxed)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new("convoy")
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("component", &self.inner.component)
            .field("dropped_events", &self.dropped_events())
            .finish()
    }
}

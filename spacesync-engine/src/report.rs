//! Migration log trail.
//!
//! The creation engine reports one event per terminal outcome through
//! an injected sink, so a caller can reconcile which entities
//! succeeded, were repaired, or failed without parsing process logs.
//! `MemorySink` records for tests and report generation; `TracingSink`
//! forwards to the process tracing subscriber.

use std::fmt;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Severity of a migration log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// One migration log event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: LogLevel,
    /// Display name of the entity the event concerns.
    pub entity: String,
    /// Event detail; error events carry the rendered source error.
    pub detail: Option<String>,
}

impl LogEvent {
    /// Info event for a successful write.
    pub fn info(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            entity: entity.into(),
            detail: Some(detail.into()),
        }
    }

    /// Warning event for a repaired-and-retried write.
    pub fn warning(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Warning,
            entity: entity.into(),
            detail: Some(detail.into()),
        }
    }

    /// Error event for a terminal per-entity failure.
    pub fn error(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            entity: entity.into(),
            detail: Some(detail.into()),
        }
    }
}

/// Destination for migration log events.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().expect("sink lock poisoned").clone()
    }

    /// Number of recorded events at `level`.
    #[must_use]
    pub fn count_at(&self, level: LogLevel) -> usize {
        self.events
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .filter(|event| event.level == level)
            .count()
    }

    /// Total number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().expect("sink lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        self.events.lock().expect("sink lock poisoned").push(event);
    }
}

/// Forwards migration events to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        let detail = event.detail.as_deref().unwrap_or("");
        match event.level {
            LogLevel::Info => info!(entity = %event.entity, "{detail}"),
            LogLevel::Warning => warn!(entity = %event.entity, "{detail}"),
            LogLevel::Error => error!(entity = %event.entity, "{detail}"),
        }
    }
}

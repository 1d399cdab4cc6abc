//! Error types for the migration engines.

use std::time::Duration;
use thiserror::Error;

/// Result type for migration operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while fetching from or writing to a space.
///
/// The creation engine handles each variant differently: `RateLimited`
/// is retried transparently, `UnknownFields` repairs the payload and
/// retries once, `AlreadyExists` is a recognized no-op, `SpaceNotFound`
/// aborts the whole run, and everything else is a terminal per-entity
/// failure.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Destination space does not exist.
    #[error("space not found: {0}")]
    SpaceNotFound(String),

    /// The backend's request quota is exhausted; `reset_secs` is the
    /// server-provided hint until it replenishes.
    #[error("rate limited: retry after {reset_secs}s")]
    RateLimited { reset_secs: u64 },

    /// The destination rejected fields absent from its content model.
    #[error("unknown fields rejected by destination: {}", fields.join(", "))]
    UnknownFields { fields: Vec<String> },

    /// The resource already exists in the destination (e.g. a locale
    /// with a taken code).
    #[error("resource already exists in destination")]
    AlreadyExists,

    /// Any other API failure.
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Returns true if this error represents a 429 rate-limit response.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            SyncError::RateLimited { .. } => true,
            SyncError::Http(e) => e.status().is_some_and(|s| s.as_u16() == 429),
            _ => false,
        }
    }

    /// Returns the retry-after duration if this is a rate-limit error.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::RateLimited { reset_secs } => Some(Duration::from_secs(*reset_secs)),
            _ => None,
        }
    }

    /// Returns true if this error aborts the whole migration run
    /// rather than a single entity.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::SpaceNotFound(_))
    }
}

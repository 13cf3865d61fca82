//! Error types for the incident diary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by an [`IncidentStore`](crate::store::IncidentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A targeted update matched no record
    #[error("record not found: {0}")]
    NotFound(String),

    /// A unique key is already taken
    #[error("record already exists: {0}")]
    Conflict(String),

    /// Storage backend failure
    #[error("store backend error: {0}")]
    Backend(String),

    /// Postgres failure
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors that abort incident dispatch before any side effect.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed alert event: {0}")]
    MalformedEvent(String),
}

/// Errors that abort an acknowledgment interaction.
#[derive(Debug, Error)]
pub enum AckError {
    /// Callback is missing the message or channel it refers to
    #[error("malformed callback: {0}")]
    MalformedCallback(String),

    /// Form was submitted without any value
    #[error("acknowledgment form submitted without a value")]
    EmptySubmission,

    /// No thread record exists for the message
    #[error("no thread record for message {message_ts} in {channel}")]
    ThreadNotFound { message_ts: String, channel: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors loading the cause menu.
#[derive(Debug, Error)]
pub enum CauseMenuError {
    #[error("failed to read cause menu {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse cause menu: {0}")]
    Parse(#[from] serde_yaml::Error),
}

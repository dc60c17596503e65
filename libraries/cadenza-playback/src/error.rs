//! Error types for playback coordination

use cadenza_core::CoreError;
use thiserror::Error;

/// Playback errors
///
/// Only programmer-misuse and direct list-mutation errors reach callers.
/// Engine, timer and connectivity faults are handled inside the coordinator.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Playlist mutation or location error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Seek interval outside the supported set
    #[error("Invalid seek interval: {0}s. Must be one of: 5, 15, 30, 60")]
    InvalidSeekInterval(u32),

    /// Handler is already registered
    #[error("Handler already subscribed")]
    AlreadySubscribed,

    /// Session store failure
    #[error("Session store error: {0}")]
    Store(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The coordinator thread has shut down
    #[error("Playback service stopped")]
    ServiceStopped,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Failure reported by a subscriber while handling a notification
///
/// Fan-out logs these and moves on to the next subscriber.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Handler error: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

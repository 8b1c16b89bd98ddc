//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for mirrorq
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MirrorqError {
    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MirrorqError {
    /// Whether this error is fatal to the whole producer call or consumer run.
    ///
    /// Invalid input is local to one event (the event is dropped); everything
    /// else is an infrastructure failure that aborts the current unit of work.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, Self::InvalidInput(_))
    }
}

/// Result type alias for mirrorq operations
pub type Result<T> = std::result::Result<T, MirrorqError>;

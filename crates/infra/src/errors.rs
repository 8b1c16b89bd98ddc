//! Infrastructure error types and conversions into the domain error

use mirrorq_domain::MirrorqError;
use thiserror::Error;

/// Errors raised inside the infrastructure layer before they are mapped
/// onto the domain error.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<InfraError> for MirrorqError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Io(io) => MirrorqError::Queue(io.to_string()),
            InfraError::Http(http) => MirrorqError::Network(http.to_string()),
            InfraError::Json(json) => MirrorqError::Config(json.to_string()),
            InfraError::Join(join) => MirrorqError::Internal(join.to_string()),
        }
    }
}

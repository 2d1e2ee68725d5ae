//! Error types for dataset-session

use shared::ApiError;
use std::path::PathBuf;

/// Errors that can occur while driving a dataset session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("Failed to write session file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    ReadUpload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save report to {path}: {source}")]
    SaveReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// The remote outcome, when this error came from the service
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SessionError::Api(e) => Some(e),
            _ => None,
        }
    }
}

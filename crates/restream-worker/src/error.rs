//! Worker error types.

use restream_models::StreamKey;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Stream already registered: {0}")]
    AlreadyExists(StreamKey),

    #[error("Stream not found: {0}")]
    NotFound(StreamKey),

    #[error("Output directory error for {key}: {source}")]
    Artifacts {
        key: StreamKey,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn artifacts(key: &StreamKey, source: std::io::Error) -> Self {
        Self::Artifacts {
            key: key.clone(),
            source,
        }
    }

    /// Check if error means the caller referenced an unknown stream.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkerError::NotFound(_))
    }

    /// Check if error is a registry conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, WorkerError::AlreadyExists(_))
    }
}

//! Dispatcher response payload.

use serde::{Deserialize, Serialize};

/// Outcome reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    /// Stream is running (newly created or already present)
    Started,
    /// Stream was stopped on request
    Stopped,
    /// Request was rejected
    Error,
}

impl StreamStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Started => "started",
            StreamStatus::Stopped => "stopped",
            StreamStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JSON body returned by the dispatcher endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamResponse {
    pub status: StreamStatus,
    /// Public playback URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    /// Human-readable detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StreamResponse {
    pub fn started(stream_url: impl Into<String>) -> Self {
        Self {
            status: StreamStatus::Started,
            stream: Some(stream_url.into()),
            message: None,
        }
    }

    pub fn stopped(message: impl Into<String>) -> Self {
        Self {
            status: StreamStatus::Stopped,
            stream: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StreamStatus::Error,
            stream: None,
            message: Some(message.into()),
        }
    }
}

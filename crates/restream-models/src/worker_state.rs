//! Worker lifecycle states and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::StreamKey;

/// Supervision state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// About to launch the transcoder for the current candidate
    #[default]
    Starting,
    /// Transcoder process has been spawned
    Running,
    /// Transcoder exited; waiting out the backoff before the next launch
    FailedRetry,
    /// Stopped on request (terminal)
    Stopped,
}

impl WorkerState {
    /// Get string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::FailedRetry => "failed_retry",
            WorkerState::Stopped => "stopped",
        }
    }

    /// Check if this is a terminal state (no more launches expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Stopped)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time view of a worker, safe to expose over the API.
///
/// Source URLs are never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub key: StreamKey,
    pub state: WorkerState,
    /// Index of the candidate currently in use
    pub source_index: usize,
    /// Number of candidate sources
    pub source_count: usize,
    /// Transcoder launches since the worker was created
    pub launches: u64,
    pub created_at: DateTime<Utc>,
}

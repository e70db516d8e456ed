//! Supervisor configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Root directory holding one output directory per stream
    pub output_root: PathBuf,
    /// Delay before launching the next candidate source
    pub short_backoff: Duration,
    /// Delay before wrapping back to the first candidate source
    pub long_backoff: Duration,
    /// Consecutive crashes logged at warn level before suppression
    pub crash_log_limit: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("/dev/shm/hls"),
            short_backoff: Duration::from_secs(1),
            long_backoff: Duration::from_secs(5),
            crash_log_limit: 3,
        }
    }
}

impl SupervisorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            output_root: std::env::var("HLS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/dev/shm/hls")),
            short_backoff: Duration::from_millis(
                std::env::var("FALLBACK_SHORT_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            long_backoff: Duration::from_millis(
                std::env::var("FALLBACK_LONG_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5000),
            ),
            crash_log_limit: std::env::var("CRASH_LOG_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
        }
    }

    /// Config rooted at `output_root` with the given backoffs; used by tests.
    pub fn with_backoffs(
        output_root: impl Into<PathBuf>,
        short_backoff: Duration,
        long_backoff: Duration,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            short_backoff,
            long_backoff,
            ..Default::default()
        }
    }
}

//! Structured worker logging.
//!
//! Gives every lifecycle event of a worker the same fields so a single
//! stream can be followed through launches, crashes and fallbacks.

use std::process::ExitStatus;
use std::time::Duration;

use restream_models::StreamKey;
use tracing::{debug, info, warn, Span};

/// Logger bound to one stream key.
#[derive(Debug, Clone)]
pub struct WorkerLogger {
    stream_key: String,
}

impl WorkerLogger {
    pub fn new(key: &StreamKey) -> Self {
        Self {
            stream_key: key.to_string(),
        }
    }

    /// Log a transcoder launch.
    pub fn log_launch(&self, source_index: usize, attempt: u64, transcoder: &str) {
        info!(
            stream_key = %self.stream_key,
            source_index,
            attempt,
            transcoder,
            "Starting transcode"
        );
    }

    /// Log a transcoder exit.
    ///
    /// `loud` selects warn over debug; see [`crate::FailureTracker`].
    pub fn log_exit(&self, source_index: usize, outcome: &str, ran_for: Duration, loud: bool) {
        let ran_for_ms = ran_for.as_millis() as u64;
        if loud {
            warn!(
                stream_key = %self.stream_key,
                source_index,
                exit_status = %outcome,
                ran_for_ms,
                "Transcoder exited, falling back"
            );
        } else {
            debug!(
                stream_key = %self.stream_key,
                source_index,
                exit_status = %outcome,
                ran_for_ms,
                "Transcoder exited, falling back"
            );
        }
    }

    /// Log the chosen fallback.
    pub fn log_fallback(&self, next_index: usize, delay: Duration, wrapped: bool) {
        debug!(
            stream_key = %self.stream_key,
            source_index = next_index,
            delay_ms = delay.as_millis() as u64,
            wrapped,
            "Scheduled relaunch"
        );
    }

    /// Log a line the transcoder wrote to stderr.
    pub fn log_transcoder_output(&self, line: &str) {
        warn!(stream_key = %self.stream_key, "transcoder: {}", line);
    }

    /// Log a manual stop.
    pub fn log_stop(&self) {
        info!(stream_key = %self.stream_key, "Stream stopped");
    }

    /// Log a non-fatal problem.
    pub fn log_warning(&self, message: &str) {
        warn!(stream_key = %self.stream_key, "{}", message);
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    /// Create a tracing span for this worker's supervisor task.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("worker", stream_key = %self.stream_key)
    }
}

/// Render an exit for logs.
pub fn describe_exit(status: &std::io::Result<ExitStatus>) -> String {
    match status {
        Ok(status) => status.to_string(),
        Err(e) => format!("wait failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_logger_creation() {
        let key = StreamKey::derive("http://origin/a.m3u8");
        let logger = WorkerLogger::new(&key);
        assert_eq!(logger.stream_key(), key.as_str());
    }

    #[test]
    fn test_describe_wait_error() {
        let err: std::io::Result<ExitStatus> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(describe_exit(&err), "wait failed: boom");
    }
}

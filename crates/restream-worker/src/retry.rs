//! Fallback sequencing and crash-streak tracking.
//!
//! Retries never give up: after the last candidate the worker wraps back to
//! the first one, waiting longer before doing so.

use std::time::Duration;
use tracing::{debug, warn};

/// Backoff rules for moving between candidate sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Delay before advancing to the next candidate.
    pub short: Duration,
    /// Delay before wrapping back to the first candidate.
    pub long: Duration,
}

/// Decision taken after a transcoder exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackStep {
    /// Candidate to launch next.
    pub next_index: usize,
    /// How long to wait before launching it.
    pub delay: Duration,
    /// Whether the list wrapped around to the first candidate.
    pub wrapped: bool,
}

impl FallbackPolicy {
    pub fn new(short: Duration, long: Duration) -> Self {
        Self { short, long }
    }

    /// Compute the step after the candidate at `index` failed.
    ///
    /// `candidates` is the length of the source list and is at least one.
    pub fn step(&self, index: usize, candidates: usize) -> FallbackStep {
        if index + 1 < candidates {
            FallbackStep {
                next_index: index + 1,
                delay: self.short,
                wrapped: false,
            }
        } else {
            FallbackStep {
                next_index: 0,
                delay: self.long,
                wrapped: true,
            }
        }
    }
}

/// Tracks consecutive short-lived transcoder runs.
///
/// A dead source makes the worker cycle forever; this keeps the log readable
/// by reporting the first few crashes of a streak at warn level and the rest
/// at debug. A run lasting at least `stable_after` ends the streak.
#[derive(Debug)]
pub struct FailureTracker {
    consecutive_failures: u32,
    max_logged_failures: u32,
    stable_after: Duration,
    suppressed: bool,
}

impl FailureTracker {
    /// Create a new failure tracker.
    pub fn new(max_logged_failures: u32, stable_after: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            max_logged_failures,
            stable_after,
            suppressed: false,
        }
    }

    /// Record a transcoder exit after it ran for `ran_for`.
    ///
    /// Returns `true` if this exit should be logged at warn level.
    pub fn record_exit(&mut self, ran_for: Duration) -> bool {
        if ran_for >= self.stable_after {
            if self.suppressed {
                debug!(
                    "Transcoder recovered after {} consecutive crashes",
                    self.consecutive_failures
                );
            }
            self.consecutive_failures = 0;
            self.suppressed = false;
        }

        self.consecutive_failures += 1;

        if self.consecutive_failures <= self.max_logged_failures {
            true
        } else {
            if !self.suppressed {
                self.suppressed = true;
                warn!(
                    "Suppressing further crash logs after {} consecutive crashes",
                    self.max_logged_failures
                );
            }
            false
        }
    }

    /// Get the current consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FallbackPolicy {
        FallbackPolicy::new(Duration::from_secs(1), Duration::from_secs(5))
    }

    #[test]
    fn test_step_advances_with_short_backoff() {
        let step = policy().step(0, 3);
        assert_eq!(step.next_index, 1);
        assert_eq!(step.delay, Duration::from_secs(1));
        assert!(!step.wrapped);
    }

    #[test]
    fn test_step_wraps_with_long_backoff() {
        let step = policy().step(2, 3);
        assert_eq!(step.next_index, 0);
        assert_eq!(step.delay, Duration::from_secs(5));
        assert!(step.wrapped);
    }

    #[test]
    fn test_single_candidate_always_wraps() {
        let step = policy().step(0, 1);
        assert_eq!(step.next_index, 0);
        assert!(step.wrapped);
    }

    #[test]
    fn test_two_candidates_alternate() {
        let policy = policy();
        let mut index = 0;
        let mut seen = vec![index];
        for _ in 0..5 {
            index = policy.step(index, 2).next_index;
            seen.push(index);
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_failure_tracker_suppression() {
        let quick = Duration::from_millis(10);
        let mut tracker = FailureTracker::new(3, Duration::from_secs(5));

        assert!(tracker.record_exit(quick));
        assert!(tracker.record_exit(quick));
        assert!(tracker.record_exit(quick));

        // Streak continues past the limit
        assert!(!tracker.record_exit(quick));
        assert!(!tracker.record_exit(quick));
        assert_eq!(tracker.failure_count(), 5);

        // A stable run starts a new streak
        assert!(tracker.record_exit(Duration::from_secs(60)));
        assert_eq!(tracker.failure_count(), 1);
    }
}

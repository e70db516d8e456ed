//! Worker metrics.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const WORKERS_ACTIVE: &str = "restream_workers_active";
    pub const TRANSCODER_LAUNCHES_TOTAL: &str = "restream_transcoder_launches_total";
    pub const TRANSCODER_EXITS_TOTAL: &str = "restream_transcoder_exits_total";
    pub const FALLBACKS_TOTAL: &str = "restream_fallbacks_total";
    pub const STOPS_TOTAL: &str = "restream_stops_total";
}

/// Update the active workers gauge.
pub fn set_active_workers(count: usize) {
    gauge!(names::WORKERS_ACTIVE).set(count as f64);
}

/// Record a transcoder launch.
pub fn record_launch() {
    counter!(names::TRANSCODER_LAUNCHES_TOTAL).increment(1);
}

/// Record a transcoder exit that was not caused by a stop.
pub fn record_exit(spawned: bool) {
    let labels = [("spawned", spawned.to_string())];
    counter!(names::TRANSCODER_EXITS_TOTAL, &labels).increment(1);
}

/// Record a fallback decision.
pub fn record_fallback(wrapped: bool) {
    let kind = if wrapped { "wrap" } else { "next" };
    let labels = [("kind", kind.to_string())];
    counter!(names::FALLBACKS_TOTAL, &labels).increment(1);
}

/// Record a manual stop.
pub fn record_stop() {
    counter!(names::STOPS_TOTAL).increment(1);
}

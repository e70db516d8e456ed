//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "restream_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "restream_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "restream_http_requests_in_flight";
    pub const DISPATCH_TOTAL: &str = "restream_dispatch_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a dispatcher action (`create`, `reuse`, `stop`, `restart`).
pub fn record_dispatch(action: &str) {
    let labels = [("action", action.to_string())];
    counter!(names::DISPATCH_TOTAL, &labels).increment(1);
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/[0-9a-f]{64}(/|$)").expect("valid key pattern")
    })
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/seg_[0-9]+\.ts$").expect("valid segment pattern")
    })
}

/// Sanitize path for metrics labels (stream keys and segment numbers).
fn sanitize_path(path: &str) -> String {
    let path = key_pattern().replace_all(path, "/:key$1");
    let path = segment_pattern().replace_all(&path, "/:segment");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        let key = "a".repeat(64);
        assert_eq!(
            sanitize_path(&format!("/live/{}/index.m3u8", key)),
            "/live/:key/index.m3u8"
        );
        assert_eq!(
            sanitize_path(&format!("/live/{}/seg_007.ts", key)),
            "/live/:key/:segment"
        );
        assert_eq!(sanitize_path("/streams"), "/streams");
    }
}

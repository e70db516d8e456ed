//! API routes.

use axum::middleware;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use crate::handlers::{dispatch, health, list_streams, ready, serve_playback};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
///
/// Any path not routed below is handled by the dispatcher.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let stream_routes = Router::new()
        .route("/", get(dispatch))
        .route("/streams", get(list_streams));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let mut router = Router::new()
        .merge(stream_routes)
        .merge(health_routes)
        .merge(metrics_routes);

    // Playback files (if served in-process rather than by a fronting web server)
    let prefix = state.config.public_path_prefix.clone();
    if state.config.serve_output && !prefix.is_empty() {
        info!(
            "Serving {} at {}",
            state.supervisor.artifacts().root().display(),
            prefix
        );
        router = router.route(&format!("{}/:key/:file", prefix), get(serve_playback));
    }

    router
        .fallback(dispatch)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

//! Stream listing.

use axum::extract::State;
use axum::Json;
use restream_models::WorkerSnapshot;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct StreamsResponse {
    pub count: usize,
    pub streams: Vec<WorkerSnapshot>,
}

/// List running streams.
pub async fn list_streams(State(state): State<AppState>) -> Json<StreamsResponse> {
    let streams = state.supervisor.list().await;
    Json(StreamsResponse {
        count: streams.len(),
        streams,
    })
}

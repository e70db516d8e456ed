//! In-process playback of the HLS output.

use std::io::ErrorKind;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use restream_media::PLAYLIST_NAME;
use restream_models::StreamKey;
use tracing::warn;

use crate::state::AppState;

/// Serve a stream's playlist or one of its segments.
///
/// Only `index.m3u8` and `seg_<n>.ts` are served, and the key must be a
/// well-formed stream key, so requests never leave the stream directory.
pub async fn serve_playback(
    State(state): State<AppState>,
    Path((key, file)): Path<(String, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    let key: StreamKey = key.parse().map_err(|_| StatusCode::NOT_FOUND)?;

    let (content_type, cache_control) = if file == PLAYLIST_NAME {
        ("application/vnd.apple.mpegurl", "no-cache")
    } else if is_segment_name(&file) {
        ("video/mp2t", "max-age=60")
    } else {
        return Err(StatusCode::NOT_FOUND);
    };

    let path = state.supervisor.output(&key).dir().join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok((
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, cache_control),
            ],
            bytes,
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            warn!(stream_key = %key, "Failed to read {}: {}", path.display(), e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Whether `name` looks like a segment written by the transcoder.
fn is_segment_name(name: &str) -> bool {
    name.strip_prefix("seg_")
        .and_then(|rest| rest.strip_suffix(".ts"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

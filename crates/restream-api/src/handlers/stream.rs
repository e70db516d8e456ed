//! Query-driven stream dispatcher.
//!
//! `GET /?stream=<url>[,<url>...]` starts (or reuses) a stream and answers
//! with its playback URL. `&stop=true` stops it and `&restart=true` replaces
//! it with a fresh worker.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use restream_media::HlsOutput;
use restream_models::{SourceList, StreamKey, StreamResponse};
use restream_worker::Ensured;
use tracing::{debug, info};

use crate::config::{ApiConfig, StartupWait};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const MISSING_STREAM: &str = "Parameter ?stream= is required";
const STREAM_STOPPED: &str = "Stream stopped.";

/// Interval between playlist checks in [`StartupWait::Playlist`] mode.
const PLAYLIST_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Dispatcher query parameters.
#[derive(Debug, Default)]
pub struct StreamQuery {
    /// Comma-separated candidate source URLs
    pub stream: Option<String>,
    pub stop: Option<String>,
    pub restart: Option<String>,
}

impl StreamQuery {
    /// Collect the known parameters from decoded query pairs. The first
    /// value of a repeated name wins; unknown names are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "stream" => &mut query.stream,
                "stop" => &mut query.stop,
                "restart" => &mut query.restart,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }

    fn is_stop(&self) -> bool {
        self.stop.as_deref() == Some("true")
    }

    fn is_restart(&self) -> bool {
        self.restart.as_deref() == Some("true")
    }
}

/// Create, reuse, stop or restart the stream named by `?stream=`.
pub async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<StreamResponse>> {
    let query = StreamQuery::from_pairs(pairs);
    let specifier = match query.stream.as_deref() {
        Some(s) if !s.is_empty() => s,
        _ => return Err(ApiError::bad_request(MISSING_STREAM)),
    };

    if query.is_stop() {
        // Keyed on the raw specifier, so it need not parse.
        let key = StreamKey::derive(specifier);
        state.supervisor.stop(&key).await?;
        metrics::record_dispatch("stop");
        info!(stream_key = %key, "Stream stopped on request");
        return Ok(Json(StreamResponse::stopped(STREAM_STOPPED)));
    }

    let sources = SourceList::parse(specifier)?;
    let key = sources.key();
    let url = playback_url(&headers, &state.config.public_path_prefix, &key);

    if query.is_restart() {
        state.supervisor.restart(&sources).await?;
        metrics::record_dispatch("restart");
        info!(stream_key = %key, "Stream restarted on request");
        wait_for_startup(&state.config, &state.supervisor.output(&key)).await;
        return Ok(Json(StreamResponse::started(url)));
    }

    match state.supervisor.ensure(&sources).await? {
        Ensured::Created(key) => {
            metrics::record_dispatch("create");
            wait_for_startup(&state.config, &state.supervisor.output(&key)).await;
        }
        Ensured::Existing(_) => {
            metrics::record_dispatch("reuse");
        }
    }

    Ok(Json(StreamResponse::started(url)))
}

/// Public playback URL of `key` as seen by the caller.
///
/// The scheme follows `X-Forwarded-Proto` so URLs stay valid behind a TLS
/// terminating proxy.
pub fn playback_url(headers: &HeaderMap, prefix: &str, key: &StreamKey) -> String {
    let scheme = match headers
        .get("X-Forwarded-Proto")
        .and_then(|v| v.to_str().ok())
    {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{}://{}{}/{}/index.m3u8", scheme, host, prefix, key)
}

/// Give a new transcoder time to produce its playlist before answering.
async fn wait_for_startup(config: &ApiConfig, output: &HlsOutput) {
    let delay = config.startup_delay;
    if delay.is_zero() {
        return;
    }

    match config.startup_wait {
        StartupWait::Fixed => tokio::time::sleep(delay).await,
        StartupWait::Playlist => {
            let poll = async {
                while !output.playlist_exists().await {
                    tokio::time::sleep(PLAYLIST_POLL_INTERVAL).await;
                }
            };
            if tokio::time::timeout(delay, poll).await.is_err() {
                debug!(
                    dir = %output.dir().display(),
                    "Playlist not ready within startup delay"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(host: &str, proto: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_str(host).unwrap());
        if let Some(proto) = proto {
            headers.insert("x-forwarded-proto", HeaderValue::from_str(proto).unwrap());
        }
        headers
    }

    #[test]
    fn test_playback_url_http() {
        let key = StreamKey::derive("http://a/1");
        let url = playback_url(&headers("example.com:8080", None), "/live", &key);
        assert_eq!(url, format!("http://example.com:8080/live/{}/index.m3u8", key));
    }

    #[test]
    fn test_playback_url_behind_tls_proxy() {
        let key = StreamKey::derive("http://a/1");
        let url = playback_url(&headers("cdn.example.com", Some("https")), "/live", &key);
        assert!(url.starts_with("https://cdn.example.com/live/"));
    }

    #[test]
    fn test_playback_url_other_proto_is_http() {
        let key = StreamKey::derive("http://a/1");
        let url = playback_url(&headers("h", Some("ws")), "", &key);
        assert_eq!(url, format!("http://h/{}/index.m3u8", key));
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_query_first_value_wins() {
        let query = StreamQuery::from_pairs(pairs(&[
            ("stream", "http://a/1"),
            ("stop", "true"),
            ("stream", "http://b/2"),
            ("stop", "false"),
            ("other", "x"),
        ]));
        assert_eq!(query.stream.as_deref(), Some("http://a/1"));
        assert!(query.is_stop());
        assert!(query.restart.is_none());
    }

    #[test]
    fn test_query_flags() {
        let query = StreamQuery {
            stream: Some("x".to_string()),
            stop: Some("true".to_string()),
            restart: Some("1".to_string()),
        };
        assert!(query.is_stop());
        assert!(!query.is_restart());
    }

    #[tokio::test]
    async fn test_playlist_wait_returns_early() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = HlsOutput::new(tmp.path());
        std::fs::write(output.playlist_path(), "#EXTM3U").unwrap();

        let config = ApiConfig {
            startup_delay: Duration::from_secs(5),
            startup_wait: StartupWait::Playlist,
            ..Default::default()
        };

        let started = std::time::Instant::now();
        wait_for_startup(&config, &output).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_playlist_wait_is_bounded() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = HlsOutput::new(tmp.path());

        let config = ApiConfig {
            startup_delay: Duration::from_millis(250),
            startup_wait: StartupWait::Playlist,
            ..Default::default()
        };

        let started = std::time::Instant::now();
        wait_for_startup(&config, &output).await;
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(250));
        assert!(waited < Duration::from_secs(2));
    }
}

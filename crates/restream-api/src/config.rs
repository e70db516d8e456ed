//! API configuration.

use std::time::Duration;

/// How the dispatcher waits after creating a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupWait {
    /// Sleep for the full startup delay
    #[default]
    Fixed,
    /// Return as soon as the playlist exists, at most after the startup delay
    Playlist,
}

impl StartupWait {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "playlist" => StartupWait::Playlist,
            _ => StartupWait::Fixed,
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Path prefix of playback URLs, e.g. `/live`
    pub public_path_prefix: String,
    /// Serve the output root under the public prefix
    pub serve_output: bool,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
    /// Delay before answering a create
    pub startup_delay: Duration,
    pub startup_wait: StartupWait,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            max_body_size: 16 * 1024,
            environment: "development".to_string(),
            public_path_prefix: "/live".to_string(),
            serve_output: false,
            metrics_enabled: true,
            startup_delay: Duration::from_millis(3000),
            startup_wait: StartupWait::Fixed,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            public_path_prefix: normalize_prefix(
                &std::env::var("PUBLIC_PATH_PREFIX").unwrap_or_else(|_| "/live".to_string()),
            ),
            serve_output: env_flag("SERVE_OUTPUT", false),
            metrics_enabled: env_flag("METRICS_ENABLED", true),
            startup_delay: Duration::from_millis(
                std::env::var("STARTUP_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
            ),
            startup_wait: std::env::var("STARTUP_WAIT")
                .map(|v| StartupWait::parse(&v))
                .unwrap_or_default(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

/// Ensure a leading slash and no trailing slash. An empty prefix stays empty.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/live"), "/live");
        assert_eq!(normalize_prefix("live/"), "/live");
        assert_eq!(normalize_prefix("/hls/live/"), "/hls/live");
        assert_eq!(normalize_prefix("/"), "");
    }

    #[test]
    fn test_startup_wait_parse() {
        assert_eq!(StartupWait::parse("playlist"), StartupWait::Playlist);
        assert_eq!(StartupWait::parse(" Playlist "), StartupWait::Playlist);
        assert_eq!(StartupWait::parse("fixed"), StartupWait::Fixed);
        assert_eq!(StartupWait::parse("bogus"), StartupWait::Fixed);
    }
}

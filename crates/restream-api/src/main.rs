//! Restreamer API server binary.

use std::sync::Arc;

use restream_media::FfmpegTranscoder;
use restream_worker::{StreamSupervisor, SupervisorConfig};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use restream_api::error::hide_internal_details;
use restream_api::{create_router, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("restream=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting restream-api");

    // Load configuration
    let config = ApiConfig::from_env();
    let supervisor_config = SupervisorConfig::from_env();
    info!(
        "API config: host={}, port={}, environment={}, output_root={}",
        config.host,
        config.port,
        config.environment,
        supervisor_config.output_root.display()
    );
    hide_internal_details(config.is_production());

    // Streams still start without ffmpeg; they retry until it appears
    let transcoder = FfmpegTranscoder::from_env();
    match transcoder.check() {
        Ok(path) => info!("Using ffmpeg at {}", path.display()),
        Err(_) => warn!(
            "ffmpeg not found ({}); streams will keep retrying until it is installed",
            transcoder.program().display()
        ),
    }

    let supervisor = Arc::new(StreamSupervisor::new(
        supervisor_config,
        Arc::new(transcoder),
    ));

    if let Err(e) = supervisor.prepare().await {
        error!("Failed to prepare output root: {}", e);
        std::process::exit(1);
    }

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Create router
    let state = AppState::new(config.clone(), Arc::clone(&supervisor));
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let listener = match tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}:{}", config.host, config.port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    supervisor.shutdown().await;

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}

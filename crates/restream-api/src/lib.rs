//! Axum HTTP dispatcher.
//!
//! This crate provides:
//! - The query-driven create/stop/restart dispatcher endpoint
//! - Stream listing, liveness and readiness endpoints
//! - Optional in-process serving of the HLS output root
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, StartupWait};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

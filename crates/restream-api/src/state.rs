//! Application state.

use std::sync::Arc;

use restream_worker::StreamSupervisor;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub supervisor: Arc<StreamSupervisor>,
}

impl AppState {
    pub fn new(config: ApiConfig, supervisor: Arc<StreamSupervisor>) -> Self {
        Self { config, supervisor }
    }
}

//! Application state.

use taskboard_queue::QueueInspector;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub inspector: QueueInspector,
}

impl AppState {
    pub fn new(config: ApiConfig, inspector: QueueInspector) -> Self {
        Self { config, inspector }
    }
}

//! Application state for the payroll engine API.

use std::sync::Arc;

use crate::config::{ConfigLoader, EngineConfig};

/// Shared application state.
///
/// Holds the loaded configuration, which is immutable for the lifetime of
/// the server and shared by every request.
#[derive(Clone)]
pub struct AppState {
    loader: Arc<ConfigLoader>,
}

impl AppState {
    /// Creates a new application state with the given configuration loader.
    pub fn new(loader: ConfigLoader) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        self.loader.config()
    }
}

//! Application state for the API server

use crate::config::Config;
use crate::converter::AudioConverter;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clones); gives handlers the converter
/// facade and read access to configuration.
#[derive(Clone)]
pub struct AppState {
    /// The conversion service facade
    pub converter: Arc<AudioConverter>,

    /// Configuration (read access for handlers)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(converter: Arc<AudioConverter>, config: Arc<Config>) -> Self {
        Self { converter, config }
    }
}

//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::detection::Detector;
use crate::realtime::EventHub;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Alert hub shared by the stream handler and detection producers
    pub hub: EventHub,
    /// Detection service backend
    pub detector: Arc<dyn Detector>,
    /// Service configuration
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, hub: EventHub, detector: Arc<dyn Detector>) -> Self {
        Self {
            hub,
            detector,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

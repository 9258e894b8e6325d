//! Cancellation chain configuration.

use std::time::Duration;

use crate::config::CancellationSettings;

/// Default window inside which a second navigation counts as rapid.
pub const DEFAULT_RAPID_NAVIGATION_THRESHOLD: Duration = Duration::from_millis(500);

/// Default number of reported errors before queued prefetches are dropped.
pub const DEFAULT_ERROR_THRESHOLD: u32 = 5;

/// Settings for the built-in handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancellationConfig {
    pub rapid_navigation_threshold: Duration,
    pub error_threshold: u32,
}

impl Default for CancellationConfig {
    fn default() -> Self {
        Self {
            rapid_navigation_threshold: DEFAULT_RAPID_NAVIGATION_THRESHOLD,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
        }
    }
}

impl From<&CancellationSettings> for CancellationConfig {
    fn from(settings: &CancellationSettings) -> Self {
        Self {
            rapid_navigation_threshold: Duration::from_millis(settings.rapid_navigation_ms),
            error_threshold: settings.error_threshold.max(1),
        }
    }
}

//! Queue processor configuration.

use std::time::Duration;

use crate::config::PrefetchSettings;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default number of commands allowed to execute at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Default interval between drain steps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest drain interval the processor will tick at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for the [`QueueProcessor`](super::QueueProcessor).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Maximum commands in the active set.
    pub max_concurrent: usize,

    /// How often the drain step runs.
    pub poll_interval: Duration,

    /// Deadline for a single command. `None` leaves a hung executor holding
    /// its slot until it settles.
    pub command_timeout: Option<Duration>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            command_timeout: None,
        }
    }
}

impl ProcessorConfig {
    /// Sets the concurrency cap (at least one).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Sets the drain interval (at least [`MIN_POLL_INTERVAL`]).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }
}

impl From<&PrefetchSettings> for ProcessorConfig {
    fn from(settings: &PrefetchSettings) -> Self {
        Self {
            max_concurrent: settings.max_concurrent.max(1),
            poll_interval: Duration::from_millis(settings.poll_interval_ms).max(MIN_POLL_INTERVAL),
            command_timeout: (settings.command_timeout_ms > 0)
                .then(|| Duration::from_millis(settings.command_timeout_ms)),
        }
    }
}

//! Default values for all configuration settings and the
//! `ConfigFile::default()` implementation.

use super::file::config_directory;
use super::settings::*;
use crate::cancel::{DEFAULT_ERROR_THRESHOLD, DEFAULT_RAPID_NAVIGATION_THRESHOLD};
use crate::logging::default_log_file;
use crate::navigation::{DEFAULT_LOOKAHEAD, DEFAULT_PREFETCH_PREVIOUS};
use crate::prefetch::{DEFAULT_MAX_CONCURRENT, DEFAULT_POLL_INTERVAL};

// =============================================================================
// [prefetch]
// =============================================================================

pub const DEFAULT_PREFETCH_MAX_CONCURRENT: usize = DEFAULT_MAX_CONCURRENT;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = DEFAULT_POLL_INTERVAL.as_millis() as u64;
/// No per-command deadline.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 0;

/// Upper bound accepted for `max_concurrent`.
pub const MAX_CONCURRENT_CEILING: usize = 64;

// =============================================================================
// [cancellation]
// =============================================================================

pub const DEFAULT_RAPID_NAVIGATION_MS: u64 = DEFAULT_RAPID_NAVIGATION_THRESHOLD.as_millis() as u64;

// =============================================================================
// ConfigFile::default()
// =============================================================================

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_PREFETCH_MAX_CONCURRENT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            lookahead: DEFAULT_LOOKAHEAD,
            prefetch_previous: DEFAULT_PREFETCH_PREVIOUS,
        }
    }
}

impl Default for CancellationSettings {
    fn default() -> Self {
        Self {
            rapid_navigation_ms: DEFAULT_RAPID_NAVIGATION_MS,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("logs"),
            file: default_log_file().to_string(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            prefetch: PrefetchSettings::default(),
            cancellation: CancellationSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[prefetch]
; Maximum prefetches executing at once (default: 3)
max_concurrent = {}
; How often queued prefetches are started, in milliseconds (default: 100)
poll_interval_ms = {}
; Deadline for a single prefetch in milliseconds; 0 disables it (default: 0)
command_timeout_ms = {}
; Pages after the current page to prefetch (default: 2)
lookahead = {}
; Also prefetch the page before the current one (default: true)
prefetch_previous = {}

[cancellation]
; Two navigations closer than this (ms) cancel stale prefetches (default: 500)
rapid_navigation_ms = {}
; Reported errors before queued prefetches are dropped (default: 5)
error_threshold = {}

[logging]
; Log directory (default: ~/.pagewarm/logs)
directory = {}
; Log file name (default: pagewarm.log)
file = {}
"#,
        config.prefetch.max_concurrent,
        config.prefetch.poll_interval_ms,
        config.prefetch.command_timeout_ms,
        config.prefetch.lookahead,
        config.prefetch.prefetch_previous,
        config.cancellation.rapid_navigation_ms,
        config.cancellation.error_threshold,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

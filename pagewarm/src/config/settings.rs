//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Queue processor and navigation settings
    pub prefetch: PrefetchSettings,
    /// Cancellation chain settings
    pub cancellation: CancellationSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[prefetch]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchSettings {
    /// Maximum prefetches executing at once
    pub max_concurrent: usize,
    /// Interval between drain steps in milliseconds
    pub poll_interval_ms: u64,
    /// Per-command deadline in milliseconds (0 = no deadline)
    pub command_timeout_ms: u64,
    /// Pages ahead of the current page to prefetch
    pub lookahead: u32,
    /// Also prefetch the page before the current one
    pub prefetch_previous: bool,
}

/// `[cancellation]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationSettings {
    /// Navigations closer together than this count as rapid
    pub rapid_navigation_ms: u64,
    /// Reported errors before queued prefetches are dropped
    pub error_threshold: u32,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory holding the log file
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}

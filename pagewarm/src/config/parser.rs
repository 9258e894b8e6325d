//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::defaults::MAX_CONCURRENT_CEILING;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [prefetch] section
    if let Some(section) = ini.section(Some("prefetch")) {
        if let Some(v) = section.get("max_concurrent") {
            let value: usize = parse_number("prefetch", "max_concurrent", v)?;
            if value == 0 || value > MAX_CONCURRENT_CEILING {
                return Err(invalid(
                    "prefetch",
                    "max_concurrent",
                    v,
                    format!("must be between 1 and {}", MAX_CONCURRENT_CEILING),
                ));
            }
            config.prefetch.max_concurrent = value;
        }
        if let Some(v) = section.get("poll_interval_ms") {
            let value: u64 = parse_number("prefetch", "poll_interval_ms", v)?;
            if value == 0 {
                return Err(invalid(
                    "prefetch",
                    "poll_interval_ms",
                    v,
                    "must be greater than 0".to_string(),
                ));
            }
            config.prefetch.poll_interval_ms = value;
        }
        if let Some(v) = section.get("command_timeout_ms") {
            config.prefetch.command_timeout_ms = parse_number("prefetch", "command_timeout_ms", v)?;
        }
        if let Some(v) = section.get("lookahead") {
            config.prefetch.lookahead = parse_number("prefetch", "lookahead", v)?;
        }
        if let Some(v) = section.get("prefetch_previous") {
            config.prefetch.prefetch_previous = parse_bool(v);
        }
    }

    // [cancellation] section
    if let Some(section) = ini.section(Some("cancellation")) {
        if let Some(v) = section.get("rapid_navigation_ms") {
            config.cancellation.rapid_navigation_ms =
                parse_number("cancellation", "rapid_navigation_ms", v)?;
        }
        if let Some(v) = section.get("error_threshold") {
            let value: u32 = parse_number("cancellation", "error_threshold", v)?;
            if value == 0 {
                return Err(invalid(
                    "cancellation",
                    "error_threshold",
                    v,
                    "must be at least 1".to_string(),
                ));
            }
            config.cancellation.error_threshold = value;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "expected a non-negative integer".to_string()))
}

fn invalid(section: &str, key: &str, value: &str, reason: String) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

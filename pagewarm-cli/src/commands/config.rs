//! Configuration management CLI commands.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use pagewarm::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration
    Show {
        /// Read this file instead of ~/.pagewarm/config.ini
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show { config } => run_show(config),
        ConfigCommands::Init { force } => run_init(force),
    }
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn run_show(path: Option<PathBuf>) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);
    let config = ConfigFile::load_from(&path)?;
    print!("{}", render(&config, &path));
    Ok(())
}

fn render(config: &ConfigFile, path: &Path) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "Configuration ({})", path.display());
    let _ = writeln!(out, "======================");
    let _ = writeln!(out);
    let _ = writeln!(out, "[prefetch]");
    let _ = writeln!(out, "  max_concurrent     = {}", config.prefetch.max_concurrent);
    let _ = writeln!(out, "  poll_interval_ms   = {}", config.prefetch.poll_interval_ms);
    let _ = writeln!(out, "  command_timeout_ms = {}", config.prefetch.command_timeout_ms);
    let _ = writeln!(out, "  lookahead          = {}", config.prefetch.lookahead);
    let _ = writeln!(out, "  prefetch_previous  = {}", config.prefetch.prefetch_previous);
    let _ = writeln!(out);
    let _ = writeln!(out, "[cancellation]");
    let _ = writeln!(out, "  rapid_navigation_ms = {}", config.cancellation.rapid_navigation_ms);
    let _ = writeln!(out, "  error_threshold     = {}", config.cancellation.error_threshold);
    let _ = writeln!(out);
    let _ = writeln!(out, "[logging]");
    let _ = writeln!(out, "  directory = {}", config.logging.directory.display());
    let _ = writeln!(out, "  file      = {}", config.logging.file);
    out
}

fn run_init(force: bool) -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

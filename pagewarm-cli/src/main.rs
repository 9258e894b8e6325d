//! pagewarm CLI - Command-line interface
//!
//! Drives the pagewarm prefetch queue against a simulated page source and
//! manages the configuration file.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "pagewarm")]
#[command(version = pagewarm::VERSION)]
#[command(about = "Priority page prefetching with cooperative cancellation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Navigate through a page script with a simulated fetcher
    Simulate(SimulateArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate_pages() {
        let cli = Cli::try_parse_from([
            "pagewarm",
            "simulate",
            "--pages",
            "1,2,3,8",
            "--failure-rate",
            "0.25",
        ])
        .unwrap();

        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.pages, vec![1, 2, 3, 8]);
                assert_eq!(args.failure_rate, 0.25);
                assert_eq!(args.interval_ms, 300);
                assert!(args.max_concurrent.is_none());
            }
            Commands::Config { .. } => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_simulate_requires_pages() {
        assert!(Cli::try_parse_from(["pagewarm", "simulate"]).is_err());
    }

    #[test]
    fn test_parse_config_init_force() {
        let cli = Cli::try_parse_from(["pagewarm", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Init { force: true }
            }
        ));
    }
}

//! `pagewarm simulate`: navigate through a page script with a simulated
//! fetcher and report what the prefetch queue did.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use pagewarm::cancel::{CancellationConfig, CancellationResult};
use pagewarm::config::{config_file_path, ConfigFile};
use pagewarm::logging::{init_logging_from, LoggingGuard};
use pagewarm::navigation::{NavigationConfig, NavigationCoordinator};
use pagewarm::prefetch::{
    CommandError, CommandInfo, ObserverError, PrefetchObserver, PrefetchQueueManager,
    ProcessorConfig, QueueStats, TracingObserver,
};
use tokio::sync::mpsc;
use tracing::info;

use super::fetcher::SimulatedFetcher;
use crate::error::CliError;

/// Arguments for `pagewarm simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Pages to visit, in order (e.g. 1,2,3,8)
    #[arg(long, value_delimiter = ',', required = true)]
    pub pages: Vec<u32>,

    /// Time spent on each page before navigating on, in milliseconds
    #[arg(long, default_value = "300")]
    pub interval_ms: u64,

    /// Simulated latency of one page fetch, in milliseconds
    #[arg(long, default_value = "250")]
    pub latency_ms: u64,

    /// Probability that a simulated fetch fails (0.0 to 1.0)
    #[arg(long, default_value = "0.0")]
    pub failure_rate: f64,

    /// Override [prefetch] max_concurrent
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Seed for the failure generator
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Read this config file instead of ~/.pagewarm/config.ini
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl SimulateArgs {
    fn validate(&self) -> Result<(), CliError> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(CliError::InvalidArgument(format!(
                "--failure-rate must be between 0.0 and 1.0, got {}",
                self.failure_rate
            )));
        }
        if self.pages.contains(&0) {
            return Err(CliError::InvalidArgument(
                "--pages are numbered from 1".to_string(),
            ));
        }
        if self.max_concurrent == Some(0) {
            return Err(CliError::InvalidArgument(
                "--max-concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Forwards executor failures to the navigation loop, which reports them to
/// the error-threshold handler.
struct ErrorForwarder {
    errors: mpsc::UnboundedSender<u32>,
}

impl PrefetchObserver for ErrorForwarder {
    fn on_command_error(&self, info: &CommandInfo, error: &CommandError) -> Result<(), ObserverError> {
        if error.is_abort() {
            return Ok(());
        }
        self.errors
            .send(info.page)
            .map_err(|_| ObserverError::new("navigation loop has finished"))
    }
}

/// Run the simulation.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    args.validate()?;

    let path = args.config.clone().unwrap_or_else(config_file_path);
    let config = ConfigFile::load_from(&path)?;
    let _logging_guard: LoggingGuard =
        init_logging_from(&config.logging).map_err(CliError::LoggingInit)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let (stats, fetcher) = runtime.block_on(simulate(&args, &config));
    print_summary(&args, &stats, &fetcher);
    Ok(())
}

async fn simulate(args: &SimulateArgs, config: &ConfigFile) -> (QueueStats, Arc<SimulatedFetcher>) {
    let mut processor_config = ProcessorConfig::from(&config.prefetch);
    if let Some(max_concurrent) = args.max_concurrent {
        processor_config = processor_config.with_max_concurrent(max_concurrent);
    }
    let poll_interval = processor_config.poll_interval;

    let manager = Arc::new(PrefetchQueueManager::new(processor_config));
    let (error_tx, mut error_rx) = mpsc::unbounded_channel();
    manager.add_observer(Arc::new(TracingObserver));
    manager.add_observer(Arc::new(ErrorForwarder { errors: error_tx }));

    let fetcher = Arc::new(SimulatedFetcher::new(
        Duration::from_millis(args.latency_ms),
        args.failure_rate,
        args.seed,
    ));
    let coordinator = NavigationCoordinator::new(
        Arc::clone(&manager),
        fetcher.clone(),
        NavigationConfig::from(&config.prefetch),
        &CancellationConfig::from(&config.cancellation),
    );

    info!(pages = ?args.pages, "Starting simulation");
    manager.start();

    let dwell = Duration::from_millis(args.interval_ms);
    for &page in &args.pages {
        let outcome = coordinator.navigate_to(page);
        println!(
            "page {:>4}: queued {} prefetch(es){}",
            page,
            outcome.queued.len(),
            describe_cancellations(&outcome.cancellations)
        );

        tokio::time::sleep(dwell).await;
        while let Ok(failed_page) = error_rx.try_recv() {
            let results = coordinator.report_error();
            if results.iter().any(|result| result.cancelled) {
                println!(
                    "page {:>4}: error threshold reached after failure on page {}{}",
                    page,
                    failed_page,
                    describe_cancellations(&results)
                );
            }
        }
    }

    // Let the last page's prefetches settle before unmounting.
    let settle_deadline = tokio::time::Instant::now()
        + Duration::from_millis(args.latency_ms.saturating_mul(4))
        + poll_interval * 4;
    while !is_idle(&manager.stats()) && tokio::time::Instant::now() < settle_deadline {
        tokio::time::sleep(poll_interval).await;
    }

    let stats = manager.stats();
    coordinator.unmount();
    info!("Simulation finished");
    (stats, fetcher)
}

fn is_idle(stats: &QueueStats) -> bool {
    stats.queue_length == 0 && stats.active_commands == 0
}

fn describe_cancellations(results: &[CancellationResult]) -> String {
    let fired: Vec<String> = results
        .iter()
        .filter(|result| result.cancelled || result.is_error())
        .map(|result| match &result.error {
            Some(error) => format!("{} failed: {}", result.handler, error),
            None => format!("{} cancelled {}", result.handler, result.affected),
        })
        .collect();

    if fired.is_empty() {
        String::new()
    } else {
        format!(" ({})", fired.join(", "))
    }
}

fn print_summary(args: &SimulateArgs, stats: &QueueStats, fetcher: &SimulatedFetcher) {
    println!();
    println!("Simulation Summary");
    println!("==================");
    println!("  Pages visited:     {}", args.pages.len());
    println!("  Max concurrent:    {}", stats.max_concurrent);
    println!("  Fetches started:   {}", fetcher.started());
    println!("  Interrupted:       {}", fetcher.interrupted());
    println!("  Completed:         {}", stats.completed_commands);
    println!("  Failed:            {}", stats.failed_commands);
    println!("  Left in queue:     {}", stats.queue_length);
    println!("  Still active:      {}", stats.active_commands);
}

//! Integration tests for the cancellation chain driving a live prefetch
//! queue through the navigation coordinator.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use pagewarm::cancel::{
    CancellationChain, CancellationConfig, CancellationContext, CancellationError,
    CancellationHandler, CancellationReason, CancellationTarget, CancellationTrigger,
    ConnectionSpeed, HandlerReport, NetworkStatus,
};
use pagewarm::navigation::{NavigationConfig, NavigationCoordinator, PageFetcher};
use pagewarm::prefetch::{AbortHandle, FetchError, PrefetchQueueManager, ProcessorConfig};
use parking_lot::Mutex;

// =============================================================================
// Test Helpers
// =============================================================================

/// Fetcher that takes `latency` unless aborted, recording both outcomes.
struct SlowFetcher {
    latency: Duration,
    finished: Arc<Mutex<Vec<u32>>>,
    interrupted: Arc<Mutex<Vec<u32>>>,
}

impl SlowFetcher {
    fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            finished: Arc::default(),
            interrupted: Arc::default(),
        })
    }

    fn finished(&self) -> Vec<u32> {
        sorted(&self.finished)
    }

    fn interrupted(&self) -> Vec<u32> {
        sorted(&self.interrupted)
    }
}

fn sorted(pages: &Mutex<Vec<u32>>) -> Vec<u32> {
    let mut pages = pages.lock().clone();
    pages.sort_unstable();
    pages
}

impl PageFetcher for SlowFetcher {
    fn fetch(&self, page: u32, abort: AbortHandle) -> BoxFuture<'static, Result<(), FetchError>> {
        let latency = self.latency;
        let finished = Arc::clone(&self.finished);
        let interrupted = Arc::clone(&self.interrupted);
        async move {
            tokio::select! {
                _ = abort.cancelled() => interrupted.lock().push(page),
                _ = tokio::time::sleep(latency) => finished.lock().push(page),
            }
            Ok(())
        }
        .boxed()
    }
}

fn started_manager() -> Arc<PrefetchQueueManager> {
    let manager = Arc::new(PrefetchQueueManager::new(
        ProcessorConfig::default().with_poll_interval(Duration::from_millis(50)),
    ));
    manager.start();
    manager
}

fn coordinator(
    manager: Arc<PrefetchQueueManager>,
    fetcher: Arc<SlowFetcher>,
    rapid_threshold: Duration,
) -> NavigationCoordinator {
    let cancellation = CancellationConfig {
        rapid_navigation_threshold: rapid_threshold,
        ..CancellationConfig::default()
    };
    NavigationCoordinator::new(manager, fetcher, NavigationConfig::default(), &cancellation)
}

// =============================================================================
// Navigation scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_rapid_navigation_interrupts_stale_prefetches() {
    let manager = started_manager();
    let fetcher = SlowFetcher::new(Duration::from_secs(2));
    // Wall-clock threshold; paused tokio time leaves it effectively unelapsed.
    let coordinator = coordinator(manager.clone(), fetcher.clone(), Duration::from_secs(60));

    coordinator.navigate_to(1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(manager.processor().active_pages().len(), 2);

    let outcome = coordinator.navigate_to(10);
    let rapid = &outcome.cancellations[0];
    assert_eq!(rapid.reason, Some(CancellationReason::RapidNavigation));
    assert!(rapid.cancelled);
    assert_eq!(rapid.affected, 2);
    assert_eq!(outcome.queued.len(), 3);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fetcher.interrupted(), vec![2, 3]);
    assert_eq!(fetcher.finished(), vec![9, 11, 12]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_navigation_lets_prefetches_finish() {
    let manager = started_manager();
    let fetcher = SlowFetcher::new(Duration::from_millis(200));
    let coordinator = coordinator(manager.clone(), fetcher.clone(), Duration::ZERO);

    coordinator.navigate_to(1);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let outcome = coordinator.navigate_to(2);

    assert!(outcome.cancellations.is_empty());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(fetcher.interrupted().is_empty());
    assert_eq!(manager.stats().completed_commands, 5);
}

#[tokio::test(start_paused = true)]
async fn test_offline_cancels_and_online_resumes() {
    let manager = started_manager();
    let fetcher = SlowFetcher::new(Duration::from_secs(2));
    let coordinator = coordinator(manager.clone(), fetcher.clone(), Duration::ZERO);

    coordinator.navigate_to(4);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let results = coordinator.set_network_status(NetworkStatus::offline());
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].reason, Some(CancellationReason::NetworkOffline));
    assert_eq!(results[0].affected, 3);

    assert!(coordinator.navigate_to(5).queued.is_empty());

    coordinator.set_network_status(NetworkStatus::online(ConnectionSpeed::Fast));
    let outcome = coordinator.navigate_to(6);
    assert_eq!(outcome.queued.len(), 3);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fetcher.interrupted(), vec![3, 5, 6]);
    assert_eq!(fetcher.finished(), vec![5, 7, 8]);
}

#[tokio::test(start_paused = true)]
async fn test_unmount_interrupts_everything_and_stops() {
    let manager = started_manager();
    let fetcher = SlowFetcher::new(Duration::from_secs(2));
    let coordinator = coordinator(manager.clone(), fetcher.clone(), Duration::ZERO);

    coordinator.navigate_to(3);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let results = coordinator.unmount();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].reason, Some(CancellationReason::ComponentUnmount));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fetcher.interrupted(), vec![2, 4, 5]);
    assert!(fetcher.finished().is_empty());
    let stats = manager.stats();
    assert!(!stats.is_running);
    assert_eq!(stats.completed_commands, 0);
}

// =============================================================================
// Custom chains
// =============================================================================

/// Pauses the queue while the connection is slow instead of cancelling.
struct PauseOnSlowNetwork {
    manager: Arc<PrefetchQueueManager>,
}

impl CancellationHandler for PauseOnSlowNetwork {
    fn name(&self) -> &'static str {
        "pause-on-slow"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn can_handle(&self, trigger: CancellationTrigger, _ctx: &CancellationContext) -> bool {
        trigger == CancellationTrigger::NetworkSlow
    }

    fn execute(&self, _ctx: &CancellationContext) -> Result<HandlerReport, CancellationError> {
        self.manager.pause();
        Ok(HandlerReport {
            cancelled: true,
            affected: 0,
            reason: CancellationReason::NetworkSlow,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_custom_high_priority_handler_preempts_builtin() {
    let manager = started_manager();
    let fetcher = SlowFetcher::new(Duration::from_millis(200));

    let target: Arc<dyn CancellationTarget> = manager.clone();
    let mut chain = CancellationChain::with_default_handlers(target, &CancellationConfig::default());
    chain.add_handler(Box::new(PauseOnSlowNetwork {
        manager: manager.clone(),
    }));

    let coordinator =
        NavigationCoordinator::with_chain(manager.clone(), fetcher, NavigationConfig::default(), chain);

    let results = coordinator.set_network_status(NetworkStatus::online(ConnectionSpeed::Slow));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].handler, "pause-on-slow");
    assert!(manager.stats().is_paused);

    // Paused: queued but not started.
    coordinator.navigate_to(1);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(manager.stats().queue_length, 2);

    manager.resume();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(manager.stats().completed_commands, 2);
}

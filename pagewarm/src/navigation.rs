//! Navigation coordinator.
//!
//! Turns page lifecycle signals into cancellation chain evaluations and
//! prefetch requests. Navigating to page `n` queues `n + 1` at high
//! priority, the rest of the lookahead window at normal priority and
//! `n - 1` at low priority.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use futures::FutureExt;
//! use pagewarm::navigation::{NavigationConfig, NavigationCoordinator};
//! use pagewarm::prefetch::{AbortHandle, PrefetchQueueManager, ProcessorConfig};
//! use pagewarm::cancel::CancellationConfig;
//!
//! let manager = Arc::new(PrefetchQueueManager::new(ProcessorConfig::default()));
//! manager.start();
//!
//! let fetcher = Arc::new(|page: u32, _abort: AbortHandle| {
//!     async move { warm_page(page).await }.boxed()
//! });
//! let coordinator = NavigationCoordinator::new(
//!     manager,
//!     fetcher,
//!     NavigationConfig::default(),
//!     &CancellationConfig::default(),
//! );
//! coordinator.navigate_to(1);
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cancel::{
    CancellationChain, CancellationConfig, CancellationContext, CancellationResult,
    CancellationTarget, CancellationTrigger, NetworkStatus,
};
use crate::config::PrefetchSettings;
use crate::prefetch::{
    AbortHandle, CommandId, FetchError, PrefetchFn, PrefetchPriority, PrefetchQueueManager,
    PrefetchStrategy,
};

// =============================================================================
// Configuration
// =============================================================================

/// Default number of pages after the current one to prefetch.
pub const DEFAULT_LOOKAHEAD: u32 = 2;

/// Whether the page before the current one is prefetched by default.
pub const DEFAULT_PREFETCH_PREVIOUS: bool = true;

/// Which pages are prefetched around the current page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationConfig {
    pub lookahead: u32,
    pub prefetch_previous: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            lookahead: DEFAULT_LOOKAHEAD,
            prefetch_previous: DEFAULT_PREFETCH_PREVIOUS,
        }
    }
}

impl From<&PrefetchSettings> for NavigationConfig {
    fn from(settings: &PrefetchSettings) -> Self {
        Self {
            lookahead: settings.lookahead,
            prefetch_previous: settings.prefetch_previous,
        }
    }
}

// =============================================================================
// Page fetcher
// =============================================================================

/// Source of the work each prefetch performs.
///
/// Implementations should check `abort` at their await points; an aborted
/// fetch may return `Ok(())`.
pub trait PageFetcher: Send + Sync + 'static {
    fn fetch(&self, page: u32, abort: AbortHandle) -> BoxFuture<'static, Result<(), FetchError>>;
}

impl<F> PageFetcher for F
where
    F: Fn(u32, AbortHandle) -> BoxFuture<'static, Result<(), FetchError>> + Send + Sync + 'static,
{
    fn fetch(&self, page: u32, abort: AbortHandle) -> BoxFuture<'static, Result<(), FetchError>> {
        self(page, abort)
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// What a navigation did.
#[derive(Debug, Default)]
pub struct NavigationOutcome {
    /// Chain results for the `PageChange` trigger.
    pub cancellations: Vec<CancellationResult>,
    /// Ids of the prefetches queued for the new page.
    pub queued: Vec<CommandId>,
}

#[derive(Debug, Default)]
struct NavigationState {
    current_page: Option<u32>,
    network: NetworkStatus,
}

/// Drives a [`PrefetchQueueManager`] and a [`CancellationChain`] from page
/// lifecycle events.
pub struct NavigationCoordinator {
    manager: Arc<PrefetchQueueManager>,
    chain: CancellationChain,
    fetcher: Arc<dyn PageFetcher>,
    config: NavigationConfig,
    state: Mutex<NavigationState>,
}

impl NavigationCoordinator {
    /// Creates a coordinator whose chain holds the built-in handlers acting
    /// on `manager`.
    pub fn new(
        manager: Arc<PrefetchQueueManager>,
        fetcher: Arc<dyn PageFetcher>,
        config: NavigationConfig,
        cancellation: &CancellationConfig,
    ) -> Self {
        let target: Arc<dyn CancellationTarget> = manager.clone();
        let chain = CancellationChain::with_default_handlers(target, cancellation);
        Self::with_chain(manager, fetcher, config, chain)
    }

    /// Creates a coordinator with a caller-built chain.
    pub fn with_chain(
        manager: Arc<PrefetchQueueManager>,
        fetcher: Arc<dyn PageFetcher>,
        config: NavigationConfig,
        chain: CancellationChain,
    ) -> Self {
        Self {
            manager,
            chain,
            fetcher,
            config,
            state: Mutex::new(NavigationState::default()),
        }
    }

    /// Records a navigation to `page`, runs the chain and queues prefetches
    /// of the surrounding pages.
    ///
    /// Nothing is queued while the network is offline or data saver is on.
    pub fn navigate_to(&self, page: u32) -> NavigationOutcome {
        if page == 0 {
            warn!("Ignoring navigation to page 0");
            return NavigationOutcome::default();
        }

        let (previous, network) = {
            let mut state = self.state.lock();
            (state.current_page.replace(page), state.network)
        };

        let ctx = CancellationContext::new(CancellationTrigger::PageChange, page)
            .with_previous_page(previous)
            .with_network(network);
        let cancellations = self.chain.evaluate(&ctx);

        if network.blocks_prefetch() {
            debug!(page, "Network blocks prefetching, nothing queued");
            return NavigationOutcome {
                cancellations,
                queued: Vec::new(),
            };
        }

        let strategy = if network.is_slow() {
            PrefetchStrategy::NetworkAware
        } else {
            PrefetchStrategy::Immediate
        };

        let queued: Vec<CommandId> = self
            .prefetch_targets(page)
            .into_iter()
            .filter_map(|(target, priority)| {
                self.manager
                    .add_prefetch_command(target, priority, strategy, self.executor_for(target))
            })
            .collect();

        info!(
            page,
            previous_page = ?previous,
            queued = queued.len(),
            cancelled = cancellations.iter().filter(|r| r.cancelled).count(),
            "Navigated"
        );
        NavigationOutcome {
            cancellations,
            queued,
        }
    }

    /// Updates the network status and runs the chain when the new status is
    /// offline or slow.
    pub fn set_network_status(&self, status: NetworkStatus) -> Vec<CancellationResult> {
        let current_page = {
            let mut state = self.state.lock();
            state.network = status;
            state.current_page.unwrap_or(0)
        };

        let trigger = if !status.is_online {
            CancellationTrigger::NetworkOffline
        } else if status.is_slow() {
            CancellationTrigger::NetworkSlow
        } else {
            return Vec::new();
        };

        debug!(trigger = %trigger, "Network status changed");
        let ctx = CancellationContext::new(trigger, current_page).with_network(status);
        self.chain.evaluate(&ctx)
    }

    /// Reports one failed page load to the error-threshold handler.
    pub fn report_error(&self) -> Vec<CancellationResult> {
        let ctx = self.context(CancellationTrigger::ErrorThreshold);
        self.chain.evaluate(&ctx)
    }

    /// Cancels all prefetching and stops the processor.
    pub fn unmount(&self) -> Vec<CancellationResult> {
        let ctx = self.context(CancellationTrigger::ComponentUnmount);
        let results = self.chain.evaluate(&ctx);
        self.manager.stop();
        info!("Navigation coordinator unmounted");
        results
    }

    pub fn current_page(&self) -> Option<u32> {
        self.state.lock().current_page
    }

    pub fn network_status(&self) -> NetworkStatus {
        self.state.lock().network
    }

    pub fn manager(&self) -> &Arc<PrefetchQueueManager> {
        &self.manager
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    fn context(&self, trigger: CancellationTrigger) -> CancellationContext {
        let state = self.state.lock();
        CancellationContext::new(trigger, state.current_page.unwrap_or(0))
            .with_network(state.network)
    }

    /// Pages to warm around `page`, most urgent first.
    fn prefetch_targets(&self, page: u32) -> Vec<(u32, PrefetchPriority)> {
        let mut targets: Vec<(u32, PrefetchPriority)> = (1..=self.config.lookahead)
            .filter_map(|offset| page.checked_add(offset))
            .map(|target| {
                let priority = if target == page + 1 {
                    PrefetchPriority::High
                } else {
                    PrefetchPriority::Normal
                };
                (target, priority)
            })
            .collect();

        if self.config.prefetch_previous && page > 1 {
            targets.push((page - 1, PrefetchPriority::Low));
        }
        targets
    }

    fn executor_for(&self, page: u32) -> PrefetchFn {
        let fetcher = Arc::clone(&self.fetcher);
        Arc::new(move |abort| fetcher.fetch(page, abort))
    }
}

impl std::fmt::Debug for NavigationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationCoordinator")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

//! Prefetch queue manager.
//!
//! The manager is the entry point feature code talks to. It issues command
//! ids and abort handles, feeds the processor, and exposes the bulk
//! cancellation operations the cancellation chain relies on. It is an
//! ordinary value: build one at the composition root and pass it down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::abort::AbortRegistry;
use super::command::{CommandId, PrefetchCommand, PrefetchFn, PrefetchPriority, PrefetchStrategy};
use super::config::ProcessorConfig;
use super::observer::{ObserverId, PrefetchObserver};
use super::processor::{QueueProcessor, QueueStats};
use crate::cancel::CancellationTarget;

/// Facade over the queue processor and the abort registry.
pub struct PrefetchQueueManager {
    processor: QueueProcessor,
    registry: Arc<AbortRegistry>,
    sequence: AtomicU64,
}

impl PrefetchQueueManager {
    /// Creates a manager with its own registry. The processor is not started.
    pub fn new(config: ProcessorConfig) -> Self {
        let registry = Arc::new(AbortRegistry::new());
        Self {
            processor: QueueProcessor::new(config, Arc::clone(&registry)),
            registry,
            sequence: AtomicU64::new(0),
        }
    }

    /// Queues a prefetch of `page`.
    ///
    /// Returns the new command's id, or `None` when the page is already
    /// queued (or is page 0, which is never valid).
    pub fn add_prefetch_command(
        &self,
        page: u32,
        priority: PrefetchPriority,
        strategy: PrefetchStrategy,
        executor: PrefetchFn,
    ) -> Option<CommandId> {
        if page == 0 {
            warn!("Ignoring prefetch request for page 0");
            return None;
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = CommandId::for_page(page, sequence);
        let abort = self.registry.create_for_prefetch(page, id.as_str());
        let command = PrefetchCommand::new(id.clone(), page, priority, strategy, abort, executor);

        if self.processor.enqueue(command) {
            debug!(command_id = %id, page, priority = %priority, "Prefetch queued");
            Some(id)
        } else {
            self.registry.release(id.as_str());
            debug!(page, "Prefetch already queued");
            None
        }
    }

    /// Cancels queued prefetches of `page`. Returns the number removed.
    pub fn cancel_page(&self, page: u32) -> usize {
        self.processor.remove_by_page(page)
    }

    /// Cancels every queued prefetch. Returns the number removed.
    pub fn clear_queue(&self) -> usize {
        self.processor.clear()
    }

    pub fn start(&self) {
        self.processor.start();
    }

    pub fn stop(&self) {
        self.processor.stop();
    }

    pub fn pause(&self) {
        self.processor.pause();
    }

    pub fn resume(&self) {
        self.processor.resume();
    }

    pub fn stats(&self) -> QueueStats {
        self.processor.stats()
    }

    pub fn add_observer(&self, observer: Arc<dyn PrefetchObserver>) -> ObserverId {
        self.processor.add_observer(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.processor.remove_observer(id)
    }

    /// The processor driving this manager.
    pub fn processor(&self) -> &QueueProcessor {
        &self.processor
    }

    /// The registry that issued every handle of this manager's commands.
    pub fn abort_registry(&self) -> &Arc<AbortRegistry> {
        &self.registry
    }
}

impl Default for PrefetchQueueManager {
    fn default() -> Self {
        Self::new(ProcessorConfig::default())
    }
}

impl std::fmt::Debug for PrefetchQueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchQueueManager")
            .field("stats", &self.stats())
            .field("registered_handles", &self.registry.len())
            .finish()
    }
}

impl CancellationTarget for PrefetchQueueManager {
    fn cancel_page(&self, page: u32) -> usize {
        PrefetchQueueManager::cancel_page(self, page)
    }

    fn clear_queue(&self) -> usize {
        PrefetchQueueManager::clear_queue(self)
    }

    fn cancel_rapid_navigation(&self, current_page: u32) -> usize {
        let aborted = self.registry.cancel_rapid_navigation(current_page);
        self.processor.purge_aborted();
        aborted
    }

    fn cancel_on_network_change(&self) -> usize {
        let aborted = self.registry.cancel_on_network_change();
        self.processor.purge_aborted();
        aborted
    }

    fn cancel_on_unmount(&self) -> usize {
        let aborted = self.registry.cancel_on_unmount();
        self.processor.purge_aborted();
        aborted
    }
}

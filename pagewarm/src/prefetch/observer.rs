//! Lifecycle observers for the queue processor.
//!
//! The processor emits events and does not care how they are consumed. Each
//! observer is isolated: an error or panic in one callback is logged and
//! suppressed, and the remaining observers are still notified.
//!
//! # Example
//!
//! ```
//! use pagewarm::prefetch::{CommandInfo, CommandOutcome, ObserverError, PrefetchObserver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CompletionCounter(AtomicUsize);
//!
//! impl PrefetchObserver for CompletionCounter {
//!     fn on_command_complete(
//!         &self,
//!         _command: &CommandInfo,
//!         _outcome: &CommandOutcome,
//!     ) -> Result<(), ObserverError> {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!         Ok(())
//!     }
//! }
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use super::command::CommandInfo;
use super::error::{CommandError, ObserverError};

/// How a command settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Succeeded,
    Failed,
}

/// Settle information passed to `on_command_complete`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    pub status: CommandStatus,
    pub duration: Duration,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Succeeded
    }
}

/// Receives processor lifecycle events.
///
/// All methods default to doing nothing.
pub trait PrefetchObserver: Send + Sync {
    /// The number of queued commands changed.
    fn on_queue_change(&self, _queue_length: usize) -> Result<(), ObserverError> {
        Ok(())
    }

    /// A command moved from the queue into the active set.
    fn on_command_start(&self, _command: &CommandInfo) -> Result<(), ObserverError> {
        Ok(())
    }

    /// A command settled, successfully or not.
    fn on_command_complete(
        &self,
        _command: &CommandInfo,
        _outcome: &CommandOutcome,
    ) -> Result<(), ObserverError> {
        Ok(())
    }

    /// A command failed. Called after `on_command_complete`.
    fn on_command_error(
        &self,
        _command: &CommandInfo,
        _error: &CommandError,
    ) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// Handle returned by observer registration, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Ordered list of registered observers.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<(ObserverId, Arc<dyn PrefetchObserver>)>,
    next_id: u64,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer and returns its id.
    pub fn add(&mut self, observer: Arc<dyn PrefetchObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Clones the current observers so they can be notified without a lock.
    pub fn snapshot(&self) -> Vec<Arc<dyn PrefetchObserver>> {
        self.observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observer_count", &self.observers.len())
            .finish()
    }
}

/// Invokes `event` on every observer, isolating failures.
pub(crate) fn notify_all<F>(observers: &[Arc<dyn PrefetchObserver>], event: &'static str, f: F)
where
    F: Fn(&dyn PrefetchObserver) -> Result<(), ObserverError>,
{
    for observer in observers {
        match catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(event, error = %e, "Prefetch observer failed");
            }
            Err(_) => {
                tracing::warn!(event, "Prefetch observer panicked");
            }
        }
    }
}

// =============================================================================
// Built-in Observers
// =============================================================================

/// Observer that logs every event using the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PrefetchObserver for TracingObserver {
    fn on_queue_change(&self, queue_length: usize) -> Result<(), ObserverError> {
        tracing::trace!(queue_length, "Prefetch queue changed");
        Ok(())
    }

    fn on_command_start(&self, command: &CommandInfo) -> Result<(), ObserverError> {
        tracing::debug!(
            command_id = %command.id,
            page = command.page,
            priority = %command.priority,
            strategy = %command.strategy,
            estimated_ms = command.estimated_duration.as_millis(),
            "Prefetch started"
        );
        Ok(())
    }

    fn on_command_complete(
        &self,
        command: &CommandInfo,
        outcome: &CommandOutcome,
    ) -> Result<(), ObserverError> {
        tracing::debug!(
            command_id = %command.id,
            page = command.page,
            status = ?outcome.status,
            duration_ms = outcome.duration.as_millis(),
            "Prefetch completed"
        );
        Ok(())
    }

    fn on_command_error(
        &self,
        command: &CommandInfo,
        error: &CommandError,
    ) -> Result<(), ObserverError> {
        if error.is_abort() {
            tracing::debug!(command_id = %command.id, page = command.page, "Prefetch aborted");
        } else {
            tracing::warn!(
                command_id = %command.id,
                page = command.page,
                error = %error,
                "Prefetch failed"
            );
        }
        Ok(())
    }
}

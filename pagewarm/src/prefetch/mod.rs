//! Speculative page prefetching.
//!
//! Feature code asks the [`PrefetchQueueManager`] to warm pages it expects
//! the user to visit next. Requests become [`PrefetchCommand`]s, wait in a
//! [`PriorityQueue`] and are executed by the [`QueueProcessor`] with a
//! bounded number in flight.
//!
//! ```text
//! add_prefetch_command ──► PriorityQueue (priority, then age; one per page)
//!                                │
//!                          drain every poll_interval
//!                                ▼
//!                      active set (≤ max_concurrent) ──► PrefetchFn(AbortHandle)
//!                                │
//!                        settle ─┴─► counters + PrefetchObserver callbacks
//! ```
//!
//! Every command owns an [`AbortHandle`] issued by the manager's
//! [`AbortRegistry`]. Cancellation is cooperative: an aborted command that
//! is still queued is skipped, one that is already running keeps going
//! unless its executor watches the handle.
//!
//! # Example
//!
//! ```ignore
//! use pagewarm::prefetch::{
//!     prefetch_fn, PrefetchPriority, PrefetchQueueManager, PrefetchStrategy, ProcessorConfig,
//! };
//!
//! let manager = PrefetchQueueManager::new(ProcessorConfig::default());
//! manager.start();
//!
//! manager.add_prefetch_command(
//!     2,
//!     PrefetchPriority::High,
//!     PrefetchStrategy::Immediate,
//!     prefetch_fn(|abort| async move {
//!         if abort.is_aborted() {
//!             return Ok(());
//!         }
//!         // ... warm page 2 ...
//!         Ok(())
//!     }),
//! );
//! ```

mod abort;
mod command;
mod config;
mod error;
mod manager;
mod observer;
mod processor;
mod queue;

pub use abort::{AbortHandle, AbortRegistry};
pub use command::{
    prefetch_fn, CommandId, CommandInfo, PrefetchCommand, PrefetchFn, PrefetchPriority,
    PrefetchStrategy, DEFAULT_ESTIMATE, DELAYED_ESTIMATE,
};
pub use config::{
    ProcessorConfig, DEFAULT_MAX_CONCURRENT, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL,
};
pub use error::{CommandError, FetchError, ObserverError};
pub use manager::PrefetchQueueManager;
pub use observer::{
    CommandOutcome, CommandStatus, ObserverId, ObserverSet, PrefetchObserver, TracingObserver,
};
pub use processor::{QueueProcessor, QueueStats};
pub use queue::PriorityQueue;

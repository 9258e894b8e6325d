//! pagewarm - speculative page prefetching with cooperative cancellation
//!
//! Paginated UIs can warm the pages a user is likely to visit next. This
//! library queues those prefetches by priority, runs a bounded number at a
//! time and cancels them when they stop being useful.
//!
//! # High-Level API
//!
//! The [`navigation`] module ties the pieces together:
//!
//! ```ignore
//! use pagewarm::navigation::{NavigationConfig, NavigationCoordinator};
//! use pagewarm::prefetch::{PrefetchQueueManager, ProcessorConfig};
//!
//! let manager = Arc::new(PrefetchQueueManager::new(ProcessorConfig::default()));
//! manager.start();
//!
//! let coordinator = NavigationCoordinator::new(
//!     manager,
//!     fetcher,
//!     NavigationConfig::default(),
//!     &CancellationConfig::default(),
//! );
//! coordinator.navigate_to(3);
//! ```
//!
//! Lower-level building blocks live in [`prefetch`] (abort handles,
//! commands, queue, processor, manager) and [`cancel`] (the cancellation
//! chain and its handlers).

pub mod cancel;
pub mod config;
pub mod logging;
pub mod navigation;
pub mod prefetch;

/// Version of the pagewarm library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

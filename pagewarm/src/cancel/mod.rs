//! Cancellation chain.
//!
//! Lifecycle signals (navigation, network changes, unmount, errors) are
//! turned into a [`CancellationContext`] and handed to a
//! [`CancellationChain`]. Handlers run in ascending priority; each decides
//! whether the trigger concerns it and cancels work through a
//! [`CancellationTarget`].
//!
//! ```text
//! trigger + context ──► RapidNavigation (1) ─┐
//!                       Unmount         (1) ─┼─ stop after a priority-1 cancel
//!                       Network         (2)  │
//!                       ErrorThreshold  (3) ◄┘
//! ```

mod chain;
mod config;
mod context;
mod error;
mod handler;
mod handlers;

#[cfg(test)]
pub(crate) mod test_support;

pub use chain::{CancellationChain, CancellationResult};
pub use config::{CancellationConfig, DEFAULT_ERROR_THRESHOLD, DEFAULT_RAPID_NAVIGATION_THRESHOLD};
pub use context::{CancellationContext, CancellationTrigger, ConnectionSpeed, NetworkStatus};
pub use error::CancellationError;
pub use handler::{
    CancellationHandler, CancellationReason, CancellationTarget, HandlerReport, HIGH_PRIORITY,
};
pub use handlers::{
    ErrorThresholdHandler, NetworkCancellationHandler, RapidNavigationHandler, UnmountHandler,
};

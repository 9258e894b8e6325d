//! Handler and target traits for the cancellation chain.
//!
//! Handlers decide whether a trigger concerns them and, if so, cancel work
//! through a [`CancellationTarget`]. The target is usually the
//! [`PrefetchQueueManager`](crate::prefetch::PrefetchQueueManager); tests can
//! substitute a recording fake.

use std::fmt;

use super::context::{CancellationContext, CancellationTrigger};
use super::error::CancellationError;

/// Priority of handlers whose success ends the chain.
pub const HIGH_PRIORITY: u8 = 1;

/// Causal tag attached to a cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CancellationReason {
    RapidNavigation,
    NetworkOffline,
    NetworkSlow,
    ComponentUnmount,
    ErrorThreshold,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RapidNavigation => "rapid-navigation",
            Self::NetworkOffline => "network-offline",
            Self::NetworkSlow => "network-slow",
            Self::ComponentUnmount => "component-unmount",
            Self::ErrorThreshold => "error-threshold",
        };
        f.write_str(name)
    }
}

/// What a handler did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandlerReport {
    pub cancelled: bool,
    pub affected: usize,
    pub reason: CancellationReason,
}

impl HandlerReport {
    /// Report whose `cancelled` flag follows the affected count.
    pub fn from_affected(affected: usize, reason: CancellationReason) -> Self {
        Self {
            cancelled: affected > 0,
            affected,
            reason,
        }
    }
}

/// Work that handlers can cancel.
pub trait CancellationTarget: Send + Sync {
    /// Cancels queued work for `page`. Returns the number removed.
    fn cancel_page(&self, page: u32) -> usize;

    /// Cancels all queued work. Returns the number removed.
    fn clear_queue(&self) -> usize;

    /// Aborts in-flight and queued work for every page except `current_page`.
    fn cancel_rapid_navigation(&self, current_page: u32) -> usize;

    /// Aborts all in-flight and queued work after a network change.
    fn cancel_on_network_change(&self) -> usize;

    /// Aborts all in-flight and queued work because the host is unmounting.
    fn cancel_on_unmount(&self) -> usize;
}

/// One link of the cancellation chain.
///
/// Handlers may keep mutable state (timestamps, counters) behind interior
/// mutability; it is private to the handler instance.
pub trait CancellationHandler: Send + Sync {
    /// Short name used in results and logs.
    fn name(&self) -> &'static str;

    /// Evaluation order; lower runs first.
    fn priority(&self) -> u8;

    /// Decides whether this handler reacts to `trigger`.
    fn can_handle(&self, trigger: CancellationTrigger, ctx: &CancellationContext) -> bool;

    /// Performs the cancellation.
    fn execute(&self, ctx: &CancellationContext) -> Result<HandlerReport, CancellationError>;
}

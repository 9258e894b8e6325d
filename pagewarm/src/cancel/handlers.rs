//! Built-in cancellation handlers.
//!
//! | Handler | Priority | Reacts to |
//! |---|---|---|
//! | [`RapidNavigationHandler`] | 1 | `RapidNavigation`, `PageChange` inside the threshold window |
//! | [`UnmountHandler`] | 1 | `ComponentUnmount`, always |
//! | [`NetworkCancellationHandler`] | 2 | `NetworkOffline`, `NetworkSlow` while offline or slow |
//! | [`ErrorThresholdHandler`] | 3 | `ErrorThreshold` once the count reaches the maximum |

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::context::{CancellationContext, CancellationTrigger};
use super::error::CancellationError;
use super::handler::{
    CancellationHandler, CancellationReason, CancellationTarget, HandlerReport, HIGH_PRIORITY,
};

// =============================================================================
// Rapid Navigation
// =============================================================================

/// Cancels stale prefetches when the user navigates faster than `threshold`.
///
/// Every evaluation records its timestamp, so only the gap between two
/// consecutive navigations matters.
pub struct RapidNavigationHandler {
    target: Arc<dyn CancellationTarget>,
    threshold: Duration,
    last_navigation: Mutex<Option<Instant>>,
}

impl RapidNavigationHandler {
    pub fn new(target: Arc<dyn CancellationTarget>, threshold: Duration) -> Self {
        Self {
            target,
            threshold,
            last_navigation: Mutex::new(None),
        }
    }
}

impl CancellationHandler for RapidNavigationHandler {
    fn name(&self) -> &'static str {
        "rapid-navigation"
    }

    fn priority(&self) -> u8 {
        HIGH_PRIORITY
    }

    fn can_handle(&self, trigger: CancellationTrigger, ctx: &CancellationContext) -> bool {
        if !matches!(
            trigger,
            CancellationTrigger::RapidNavigation | CancellationTrigger::PageChange
        ) {
            return false;
        }

        let previous = self.last_navigation.lock().replace(ctx.timestamp);
        previous.is_some_and(|last| ctx.timestamp.saturating_duration_since(last) < self.threshold)
    }

    fn execute(&self, ctx: &CancellationContext) -> Result<HandlerReport, CancellationError> {
        let removed = ctx
            .previous_page
            .map_or(0, |page| self.target.cancel_page(page));
        let aborted = self.target.cancel_rapid_navigation(ctx.current_page);

        debug!(
            current_page = ctx.current_page,
            previous_page = ?ctx.previous_page,
            removed,
            aborted,
            "Rapid navigation cancelled prefetches"
        );
        Ok(HandlerReport::from_affected(
            removed + aborted,
            CancellationReason::RapidNavigation,
        ))
    }
}

// =============================================================================
// Unmount
// =============================================================================

/// Cancels everything when the host component goes away.
pub struct UnmountHandler {
    target: Arc<dyn CancellationTarget>,
}

impl UnmountHandler {
    pub fn new(target: Arc<dyn CancellationTarget>) -> Self {
        Self { target }
    }
}

impl CancellationHandler for UnmountHandler {
    fn name(&self) -> &'static str {
        "unmount"
    }

    fn priority(&self) -> u8 {
        HIGH_PRIORITY
    }

    fn can_handle(&self, trigger: CancellationTrigger, _ctx: &CancellationContext) -> bool {
        trigger == CancellationTrigger::ComponentUnmount
    }

    fn execute(&self, _ctx: &CancellationContext) -> Result<HandlerReport, CancellationError> {
        let aborted = self.target.cancel_on_unmount();
        self.target.clear_queue();

        debug!(aborted, "Unmount cancelled prefetches");
        Ok(HandlerReport {
            cancelled: true,
            affected: aborted,
            reason: CancellationReason::ComponentUnmount,
        })
    }
}

// =============================================================================
// Network
// =============================================================================

/// Cancels everything while the network is offline or slow.
pub struct NetworkCancellationHandler {
    target: Arc<dyn CancellationTarget>,
}

impl NetworkCancellationHandler {
    pub fn new(target: Arc<dyn CancellationTarget>) -> Self {
        Self { target }
    }
}

impl CancellationHandler for NetworkCancellationHandler {
    fn name(&self) -> &'static str {
        "network"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn can_handle(&self, trigger: CancellationTrigger, ctx: &CancellationContext) -> bool {
        matches!(
            trigger,
            CancellationTrigger::NetworkOffline | CancellationTrigger::NetworkSlow
        ) && (!ctx.network.is_online || ctx.network.is_slow())
    }

    fn execute(&self, ctx: &CancellationContext) -> Result<HandlerReport, CancellationError> {
        let reason = if ctx.network.is_online {
            CancellationReason::NetworkSlow
        } else {
            CancellationReason::NetworkOffline
        };
        let aborted = self.target.cancel_on_network_change();
        self.target.clear_queue();

        debug!(aborted, reason = %reason, "Network change cancelled prefetches");
        Ok(HandlerReport::from_affected(aborted, reason))
    }
}

// =============================================================================
// Error Threshold
// =============================================================================

/// Drops queued prefetches after repeated errors.
///
/// Each `ErrorThreshold` trigger counts one error; a `PageChange` that
/// reaches this handler resets the count.
pub struct ErrorThresholdHandler {
    target: Arc<dyn CancellationTarget>,
    max_errors: u32,
    error_count: Mutex<u32>,
}

impl ErrorThresholdHandler {
    pub fn new(target: Arc<dyn CancellationTarget>, max_errors: u32) -> Self {
        Self {
            target,
            max_errors,
            error_count: Mutex::new(0),
        }
    }

    /// Errors counted since the last reset.
    pub fn error_count(&self) -> u32 {
        *self.error_count.lock()
    }
}

impl CancellationHandler for ErrorThresholdHandler {
    fn name(&self) -> &'static str {
        "error-threshold"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn can_handle(&self, trigger: CancellationTrigger, _ctx: &CancellationContext) -> bool {
        let mut count = self.error_count.lock();
        match trigger {
            CancellationTrigger::PageChange => {
                *count = 0;
                false
            }
            CancellationTrigger::ErrorThreshold => {
                *count += 1;
                *count >= self.max_errors
            }
            _ => false,
        }
    }

    fn execute(&self, _ctx: &CancellationContext) -> Result<HandlerReport, CancellationError> {
        let removed = self.target.clear_queue();
        let errors = std::mem::take(&mut *self.error_count.lock());

        debug!(removed, errors, "Error threshold reached, dropped queued prefetches");
        Ok(HandlerReport::from_affected(
            removed,
            CancellationReason::ErrorThreshold,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::context::{ConnectionSpeed, NetworkStatus};
    use crate::cancel::test_support::RecordingTarget;

    fn ctx_at(trigger: CancellationTrigger, page: u32, at: Instant) -> CancellationContext {
        CancellationContext::new(trigger, page)
            .with_previous_page(page.checked_sub(1))
            .with_timestamp(at)
    }

    #[test]
    fn test_rapid_navigation_first_event_is_not_rapid() {
        let handler = RapidNavigationHandler::new(
            Arc::new(RecordingTarget::default()),
            Duration::from_millis(500),
        );
        let ctx = ctx_at(CancellationTrigger::PageChange, 2, Instant::now());
        assert!(!handler.can_handle(ctx.trigger, &ctx));
    }

    #[test]
    fn test_rapid_navigation_within_threshold() {
        let target = Arc::new(RecordingTarget::default());
        let handler = RapidNavigationHandler::new(
            Arc::clone(&target) as Arc<dyn CancellationTarget>,
            Duration::from_millis(500),
        );
        let base = Instant::now();

        let first = ctx_at(CancellationTrigger::PageChange, 2, base);
        assert!(!handler.can_handle(first.trigger, &first));

        let second = ctx_at(
            CancellationTrigger::PageChange,
            3,
            base + Duration::from_millis(100),
        );
        assert!(handler.can_handle(second.trigger, &second));

        target.set_page_removals(1);
        target.set_rapid_aborts(2);
        let report = handler.execute(&second).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.affected, 3);
        assert_eq!(report.reason, CancellationReason::RapidNavigation);
        assert_eq!(target.cancelled_pages(), vec![2]);
        assert_eq!(target.rapid_navigation_pages(), vec![3]);
    }

    #[test]
    fn test_rapid_navigation_outside_threshold() {
        let handler = RapidNavigationHandler::new(
            Arc::new(RecordingTarget::default()),
            Duration::from_millis(500),
        );
        let base = Instant::now();
        let first = ctx_at(CancellationTrigger::PageChange, 2, base);
        handler.can_handle(first.trigger, &first);

        let later = ctx_at(
            CancellationTrigger::PageChange,
            3,
            base + Duration::from_millis(800),
        );
        assert!(!handler.can_handle(later.trigger, &later));
    }

    #[test]
    fn test_rapid_navigation_ignores_other_triggers() {
        let handler = RapidNavigationHandler::new(
            Arc::new(RecordingTarget::default()),
            Duration::from_millis(500),
        );
        let ctx = ctx_at(CancellationTrigger::NetworkOffline, 2, Instant::now());
        assert!(!handler.can_handle(ctx.trigger, &ctx));
        assert!(!handler.can_handle(ctx.trigger, &ctx));
    }

    #[test]
    fn test_unmount_always_reports_cancelled() {
        let target = Arc::new(RecordingTarget::default());
        let handler = UnmountHandler::new(Arc::clone(&target) as Arc<dyn CancellationTarget>);
        let ctx = CancellationContext::new(CancellationTrigger::ComponentUnmount, 1);

        assert!(handler.can_handle(ctx.trigger, &ctx));
        let report = handler.execute(&ctx).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.affected, 0);
        assert_eq!(target.unmounts(), 1);
        assert_eq!(target.clears(), 1);
    }

    #[test]
    fn test_network_handler_conditions() {
        let handler = NetworkCancellationHandler::new(Arc::new(RecordingTarget::default()));

        let offline = CancellationContext::new(CancellationTrigger::NetworkOffline, 1)
            .with_network(NetworkStatus::offline());
        assert!(handler.can_handle(offline.trigger, &offline));

        let slow = CancellationContext::new(CancellationTrigger::NetworkSlow, 1)
            .with_network(NetworkStatus::online(ConnectionSpeed::Slow));
        assert!(handler.can_handle(slow.trigger, &slow));

        let fast = CancellationContext::new(CancellationTrigger::NetworkSlow, 1)
            .with_network(NetworkStatus::online(ConnectionSpeed::Fast));
        assert!(!handler.can_handle(fast.trigger, &fast));

        let unrelated = CancellationContext::new(CancellationTrigger::PageChange, 1)
            .with_network(NetworkStatus::offline());
        assert!(!handler.can_handle(unrelated.trigger, &unrelated));
    }

    #[test]
    fn test_network_handler_reason_follows_status() {
        let target = Arc::new(RecordingTarget::default());
        target.set_network_aborts(4);
        let handler =
            NetworkCancellationHandler::new(Arc::clone(&target) as Arc<dyn CancellationTarget>);

        let offline = CancellationContext::new(CancellationTrigger::NetworkOffline, 1)
            .with_network(NetworkStatus::offline());
        let report = handler.execute(&offline).unwrap();
        assert_eq!(report.reason, CancellationReason::NetworkOffline);
        assert_eq!(report.affected, 4);

        let slow = CancellationContext::new(CancellationTrigger::NetworkSlow, 1)
            .with_network(NetworkStatus::online(ConnectionSpeed::Slow));
        assert_eq!(
            handler.execute(&slow).unwrap().reason,
            CancellationReason::NetworkSlow
        );
    }

    #[test]
    fn test_error_threshold_counts_and_resets() {
        let target = Arc::new(RecordingTarget::default());
        let handler =
            ErrorThresholdHandler::new(Arc::clone(&target) as Arc<dyn CancellationTarget>, 3);
        let error = CancellationContext::new(CancellationTrigger::ErrorThreshold, 1);
        let page_change = CancellationContext::new(CancellationTrigger::PageChange, 2);

        assert!(!handler.can_handle(error.trigger, &error));
        assert!(!handler.can_handle(error.trigger, &error));
        assert!(!handler.can_handle(page_change.trigger, &page_change));
        assert_eq!(handler.error_count(), 0);

        assert!(!handler.can_handle(error.trigger, &error));
        assert!(!handler.can_handle(error.trigger, &error));
        assert!(handler.can_handle(error.trigger, &error));

        target.set_queue_clears(2);
        let report = handler.execute(&error).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.affected, 2);
        assert_eq!(handler.error_count(), 0);
    }
}

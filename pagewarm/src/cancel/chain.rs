//! Ordered evaluation of cancellation handlers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::config::CancellationConfig;
use super::context::CancellationContext;
use super::handler::{
    CancellationHandler, CancellationReason, CancellationTarget, HandlerReport, HIGH_PRIORITY,
};
use super::handlers::{
    ErrorThresholdHandler, NetworkCancellationHandler, RapidNavigationHandler, UnmountHandler,
};

/// Outcome of one handler that reacted to a trigger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancellationResult {
    pub handler: &'static str,
    pub priority: u8,
    pub cancelled: bool,
    pub affected: usize,
    /// `None` when the handler failed before reporting.
    pub reason: Option<CancellationReason>,
    pub duration: Duration,
    pub error: Option<String>,
}

impl CancellationResult {
    fn from_report(handler: &dyn CancellationHandler, report: HandlerReport, duration: Duration) -> Self {
        Self {
            handler: handler.name(),
            priority: handler.priority(),
            cancelled: report.cancelled,
            affected: report.affected,
            reason: Some(report.reason),
            duration,
            error: None,
        }
    }

    fn failed(handler: &dyn CancellationHandler, error: String, duration: Duration) -> Self {
        Self {
            handler: handler.name(),
            priority: handler.priority(),
            cancelled: false,
            affected: 0,
            reason: None,
            duration,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Handlers evaluated in ascending priority.
///
/// Handlers with equal priority keep their registration order. Once a
/// priority-1 handler reports a cancellation the remaining handlers are not
/// consulted for that evaluation.
#[derive(Default)]
pub struct CancellationChain {
    handlers: Vec<Box<dyn CancellationHandler>>,
}

impl CancellationChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with the four built-in handlers acting on `target`.
    pub fn with_default_handlers(
        target: Arc<dyn CancellationTarget>,
        config: &CancellationConfig,
    ) -> Self {
        let mut chain = Self::new();
        chain.add_handler(Box::new(RapidNavigationHandler::new(
            Arc::clone(&target),
            config.rapid_navigation_threshold,
        )));
        chain.add_handler(Box::new(UnmountHandler::new(Arc::clone(&target))));
        chain.add_handler(Box::new(NetworkCancellationHandler::new(Arc::clone(&target))));
        chain.add_handler(Box::new(ErrorThresholdHandler::new(
            target,
            config.error_threshold,
        )));
        chain
    }

    /// Registers a handler at its priority position.
    pub fn add_handler(&mut self, handler: Box<dyn CancellationHandler>) {
        let position = self
            .handlers
            .iter()
            .position(|existing| existing.priority() > handler.priority())
            .unwrap_or(self.handlers.len());
        self.handlers.insert(position, handler);
    }

    /// Handler names in evaluation order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs every handler that accepts `ctx.trigger`.
    ///
    /// Handler errors and panics are captured as failed entries and never
    /// stop evaluation.
    pub fn evaluate(&self, ctx: &CancellationContext) -> Vec<CancellationResult> {
        let mut results = Vec::new();

        for handler in &self.handlers {
            let handler = handler.as_ref();
            let accepted = catch_unwind(AssertUnwindSafe(|| handler.can_handle(ctx.trigger, ctx)));
            match accepted {
                Ok(true) => {}
                Ok(false) => continue,
                Err(_) => {
                    warn!(handler = handler.name(), trigger = %ctx.trigger, "Cancellation handler panicked in can_handle");
                    results.push(CancellationResult::failed(
                        handler,
                        "panicked while matching trigger".to_string(),
                        Duration::ZERO,
                    ));
                    continue;
                }
            }

            let started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.execute(ctx)));
            let duration = started.elapsed();

            let result = match outcome {
                Ok(Ok(report)) => CancellationResult::from_report(handler, report, duration),
                Ok(Err(e)) => {
                    warn!(handler = handler.name(), trigger = %ctx.trigger, error = %e, "Cancellation handler failed");
                    CancellationResult::failed(handler, e.to_string(), duration)
                }
                Err(_) => {
                    warn!(handler = handler.name(), trigger = %ctx.trigger, "Cancellation handler panicked");
                    CancellationResult::failed(handler, "panicked during execute".to_string(), duration)
                }
            };

            let short_circuit = result.cancelled && result.priority == HIGH_PRIORITY;
            debug!(
                handler = result.handler,
                trigger = %ctx.trigger,
                cancelled = result.cancelled,
                affected = result.affected,
                "Cancellation handler executed"
            );
            results.push(result);

            if short_circuit {
                break;
            }
        }

        results
    }
}

impl std::fmt::Debug for CancellationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationChain")
            .field("handlers", &self.handler_names())
            .finish()
    }
}

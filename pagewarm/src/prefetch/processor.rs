//! Queue processor: drains the priority queue under a concurrency cap.
//!
//! A ticker task wakes every `poll_interval` and runs one drain step. The
//! drain step moves commands from the queue into the active set until the
//! cap is reached and spawns each one; it never waits for them. When a
//! command settles, it leaves the active set, the counters are updated and
//! observers are told.
//!
//! ```text
//!   enqueue ──► PriorityQueue ──drain()──► active set ──spawn──► execute()
//!                                             ▲                     │
//!                                             └───── settle() ◄─────┘
//! ```
//!
//! All state sits behind one mutex that is never held across an await or
//! while observers run.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::abort::AbortRegistry;
use super::command::{CommandId, PrefetchCommand};
use super::config::{ProcessorConfig, MIN_POLL_INTERVAL};
use super::error::CommandError;
use super::observer::{
    notify_all, CommandOutcome, CommandStatus, ObserverId, ObserverSet, PrefetchObserver,
};
use super::queue::PriorityQueue;

/// Point-in-time processor statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub queue_length: usize,
    pub active_commands: usize,
    pub completed_commands: u64,
    pub failed_commands: u64,
    pub max_concurrent: usize,
    pub is_running: bool,
    pub is_paused: bool,
}

#[derive(Debug)]
struct ActiveCommand {
    command: PrefetchCommand,
    started_at: Instant,
}

#[derive(Debug, Default)]
struct ProcessorState {
    queue: PriorityQueue,
    active: HashMap<CommandId, ActiveCommand>,
    completed: u64,
    failed: u64,
    is_running: bool,
    is_paused: bool,
    ticker: Option<CancellationToken>,
}

struct Shared {
    config: ProcessorConfig,
    registry: Arc<AbortRegistry>,
    state: Mutex<ProcessorState>,
    observers: Mutex<ObserverSet>,
}

/// Executes queued prefetch commands with bounded concurrency.
///
/// Cloning yields another handle to the same processor. [`start`](Self::start)
/// spawns onto the current tokio runtime.
#[derive(Clone)]
pub struct QueueProcessor {
    shared: Arc<Shared>,
}

impl QueueProcessor {
    /// Creates a stopped processor.
    ///
    /// Registry entries of settled or discarded commands are released from
    /// `registry`.
    pub fn new(config: ProcessorConfig, registry: Arc<AbortRegistry>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                registry,
                state: Mutex::new(ProcessorState::default()),
                observers: Mutex::new(ObserverSet::new()),
            }),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.shared.config
    }

    // -------------------------------------------------------------------------
    // Queue access
    // -------------------------------------------------------------------------

    /// Adds a command to the queue. Returns false for a duplicate page.
    pub fn enqueue(&self, command: PrefetchCommand) -> bool {
        let (accepted, queue_length) = {
            let mut state = self.shared.state.lock();
            let accepted = state.queue.enqueue(command);
            (accepted, state.queue.len())
        };
        if accepted {
            self.notify_queue_change(queue_length);
        }
        accepted
    }

    /// Aborts and removes queued commands for `page`. Returns the count.
    pub fn remove_by_page(&self, page: u32) -> usize {
        let (removed, queue_length) = {
            let mut state = self.shared.state.lock();
            let removed = state.queue.remove_by_page(page);
            (removed, state.queue.len())
        };
        self.release_removed(&removed, queue_length)
    }

    /// Aborts and removes every queued command. Returns the count.
    pub fn clear(&self) -> usize {
        let removed = self.shared.state.lock().queue.clear();
        self.release_removed(&removed, 0)
    }

    /// Drops queued commands that were aborted elsewhere. Returns the count.
    pub fn purge_aborted(&self) -> usize {
        let (removed, queue_length) = {
            let mut state = self.shared.state.lock();
            let removed = state.queue.remove_aborted();
            (removed, state.queue.len())
        };
        self.release_removed(&removed, queue_length)
    }

    /// Queued pages in execution order.
    pub fn queued_pages(&self) -> Vec<u32> {
        self.shared.state.lock().queue.pages()
    }

    /// Pages currently executing, in no particular order.
    pub fn active_pages(&self) -> Vec<u32> {
        self.shared
            .state
            .lock()
            .active
            .values()
            .map(|active| active.command.page())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Starts the periodic drain. Calling it while running does nothing.
    pub fn start(&self) {
        let token = {
            let mut state = self.shared.state.lock();
            if state.is_running {
                return;
            }
            state.is_running = true;
            state.is_paused = false;
            let token = CancellationToken::new();
            state.ticker = Some(token.clone());
            token
        };

        // The config fields are public, so a zero interval can still get here.
        let poll_interval = self.shared.config.poll_interval.max(MIN_POLL_INTERVAL);
        info!(
            max_concurrent = self.shared.config.max_concurrent,
            poll_interval_ms = poll_interval.as_millis(),
            "Prefetch processor started"
        );

        tokio::spawn(run_ticker(Arc::downgrade(&self.shared), poll_interval, token));
    }

    /// Halts the drain and aborts every executing command.
    ///
    /// Queued commands stay queued. Commands that settle after this call
    /// are not counted.
    pub fn stop(&self) {
        let discarded: Vec<ActiveCommand> = {
            let mut state = self.shared.state.lock();
            if let Some(ticker) = state.ticker.take() {
                ticker.cancel();
            }
            state.is_running = false;
            state.is_paused = false;
            state.active.drain().map(|(_, active)| active).collect()
        };

        for active in &discarded {
            active.command.abort_handle().abort();
            self.shared
                .registry
                .release(active.command.id().as_str());
        }

        info!(aborted = discarded.len(), "Prefetch processor stopped");
    }

    /// Stops dequeuing. In-flight commands keep running.
    ///
    /// Ignored while the processor is stopped.
    pub fn pause(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.is_running {
                return;
            }
            state.is_paused = true;
        }
        debug!("Prefetch processor paused");
    }

    /// Resumes dequeuing after [`pause`](Self::pause).
    pub fn resume(&self) {
        self.shared.state.lock().is_paused = false;
        debug!("Prefetch processor resumed");
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().is_running
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.shared.state.lock();
        QueueStats {
            queue_length: state.queue.len(),
            active_commands: state.active.len(),
            completed_commands: state.completed,
            failed_commands: state.failed,
            max_concurrent: self.shared.config.max_concurrent,
            is_running: state.is_running,
            is_paused: state.is_paused,
        }
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    pub fn add_observer(&self, observer: Arc<dyn PrefetchObserver>) -> ObserverId {
        self.shared.observers.lock().add(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.shared.observers.lock().remove(id)
    }

    // -------------------------------------------------------------------------
    // Drain and settle
    // -------------------------------------------------------------------------

    /// Runs one drain step and returns the number of commands dispatched.
    ///
    /// Does nothing unless the processor is running and not paused. Commands
    /// aborted while queued are dropped without using a slot.
    pub fn drain(&self) -> usize {
        let (started, skipped, queue_length) = {
            let mut state = self.shared.state.lock();
            if !state.is_running || state.is_paused {
                return 0;
            }

            let mut started = Vec::new();
            let mut skipped = Vec::new();
            while state.active.len() < self.shared.config.max_concurrent {
                let Some(command) = state.queue.dequeue() else {
                    break;
                };
                if !command.can_execute() {
                    skipped.push(command.id().clone());
                    continue;
                }
                state.active.insert(
                    command.id().clone(),
                    ActiveCommand {
                        command: command.clone(),
                        started_at: Instant::now(),
                    },
                );
                started.push(command);
            }
            (started, skipped, state.queue.len())
        };

        for id in &skipped {
            trace!(command_id = %id, "Skipping aborted prefetch");
            self.shared.registry.release(id.as_str());
        }
        if started.is_empty() && skipped.is_empty() {
            return 0;
        }
        self.notify_queue_change(queue_length);

        let observers = self.observers();
        let dispatched = started.len();
        for command in started {
            let info = command.info();
            notify_all(&observers, "command_start", |o| o.on_command_start(&info));
            self.spawn_execution(command);
        }
        dispatched
    }

    fn spawn_execution(&self, command: PrefetchCommand) {
        let processor = self.clone();
        tokio::spawn(async move {
            let result = processor.run_command(&command).await;
            processor.settle(&command, result);
        });
    }

    async fn run_command(&self, command: &PrefetchCommand) -> Result<(), CommandError> {
        let page = command.page();
        let execution = AssertUnwindSafe(command.execute()).catch_unwind();

        let joined = match self.shared.config.command_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, execution).await {
                Ok(joined) => joined,
                Err(_) => {
                    command.abort_handle().abort();
                    return Err(CommandError::TimedOut { page, timeout });
                }
            },
            None => execution.await,
        };

        match joined {
            Ok(result) => result,
            Err(panic) => Err(CommandError::Panicked {
                page,
                message: panic_message(panic.as_ref()),
            }),
        }
    }

    fn settle(&self, command: &PrefetchCommand, result: Result<(), CommandError>) {
        let started_at = {
            let mut state = self.shared.state.lock();
            let Some(active) = state.active.remove(command.id()) else {
                drop(state);
                trace!(command_id = %command.id(), "Ignoring settle of discarded prefetch");
                return;
            };
            if result.is_ok() {
                state.completed += 1;
            } else {
                state.failed += 1;
            }
            active.started_at
        };
        self.shared.registry.release(command.id().as_str());

        let info = command.info();
        let outcome = CommandOutcome {
            status: if result.is_ok() {
                CommandStatus::Succeeded
            } else {
                CommandStatus::Failed
            },
            duration: started_at.elapsed(),
        };

        match &result {
            Ok(()) => trace!(command_id = %info.id, page = info.page, "Prefetch succeeded"),
            Err(e) if e.is_abort() => debug!(command_id = %info.id, page = info.page, "Prefetch aborted"),
            Err(e) => warn!(command_id = %info.id, page = info.page, error = %e, "Prefetch failed"),
        }

        let observers = self.observers();
        notify_all(&observers, "command_complete", |o| {
            o.on_command_complete(&info, &outcome)
        });
        if let Err(error) = &result {
            notify_all(&observers, "command_error", |o| o.on_command_error(&info, error));
        }
    }

    fn release_removed(&self, removed: &[CommandId], queue_length: usize) -> usize {
        for id in removed {
            self.shared.registry.release(id.as_str());
        }
        if !removed.is_empty() {
            self.notify_queue_change(queue_length);
        }
        removed.len()
    }

    fn notify_queue_change(&self, queue_length: usize) {
        let observers = self.observers();
        notify_all(&observers, "queue_change", |o| o.on_queue_change(queue_length));
    }

    fn observers(&self) -> Vec<Arc<dyn PrefetchObserver>> {
        self.shared.observers.lock().snapshot()
    }
}

impl std::fmt::Debug for QueueProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueProcessor")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Ticker loop. Ends when stopped or when every processor handle is dropped.
async fn run_ticker(shared: Weak<Shared>, poll_interval: Duration, token: CancellationToken) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => break,

            _ = interval.tick() => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                QueueProcessor { shared }.drain();
            }
        }
    }
    trace!("Prefetch ticker exited");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

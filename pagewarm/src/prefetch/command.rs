//! Prefetch commands.
//!
//! A [`PrefetchCommand`] pairs a page with its scheduling metadata and the
//! async executor that warms it. Commands are immutable once built; the only
//! state that changes is the abort flag of the handle they own.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;

use super::abort::AbortHandle;
use super::error::{CommandError, FetchError};

/// Async function that performs the prefetch for one command.
///
/// It receives a clone of the command's abort handle so that it can stop
/// early when cancelled.
pub type PrefetchFn =
    Arc<dyn Fn(AbortHandle) -> BoxFuture<'static, Result<(), FetchError>> + Send + Sync>;

/// Estimated duration reported for `Delayed` commands.
pub const DELAYED_ESTIMATE: Duration = Duration::from_millis(2000);

/// Estimated duration reported for every other strategy.
pub const DEFAULT_ESTIMATE: Duration = Duration::from_millis(1000);

// =============================================================================
// Priority and Strategy
// =============================================================================

/// Queue priority of a prefetch command.
///
/// Ordering follows the rank: `High < Normal < Low`, so sorting ascending
/// puts the most urgent work first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrefetchPriority {
    High,
    Normal,
    Low,
}

impl PrefetchPriority {
    /// Numeric rank used for queue ordering (lower runs first).
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

impl fmt::Display for PrefetchPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// How a prefetch was requested.
///
/// Only affects [`PrefetchCommand::estimated_duration`]; scheduling ignores it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrefetchStrategy {
    #[default]
    Immediate,
    Delayed,
    NetworkAware,
}

impl PrefetchStrategy {
    /// Duration hint for observability.
    pub fn estimated_duration(self) -> Duration {
        match self {
            Self::Delayed => DELAYED_ESTIMATE,
            Self::Immediate | Self::NetworkAware => DEFAULT_ESTIMATE,
        }
    }
}

impl fmt::Display for PrefetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Delayed => write!(f, "delayed"),
            Self::NetworkAware => write!(f, "network-aware"),
        }
    }
}

// =============================================================================
// Command Id
// =============================================================================

/// Unique identifier of a prefetch command.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(String);

impl CommandId {
    /// Creates an id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the id for the `sequence`-th request of `page`.
    pub fn for_page(page: u32, sequence: u64) -> Self {
        Self(format!("page-{}-{}", page, sequence))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Command
// =============================================================================

/// Plain-data view of a command, handed to observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInfo {
    pub id: CommandId,
    pub page: u32,
    pub priority: PrefetchPriority,
    pub strategy: PrefetchStrategy,
    pub estimated_duration: Duration,
}

/// One unit of speculative work.
#[derive(Clone)]
pub struct PrefetchCommand {
    id: CommandId,
    page: u32,
    priority: PrefetchPriority,
    strategy: PrefetchStrategy,
    created_at: Instant,
    abort: AbortHandle,
    executor: PrefetchFn,
}

impl PrefetchCommand {
    /// Creates a command stamped with the current instant.
    pub fn new(
        id: CommandId,
        page: u32,
        priority: PrefetchPriority,
        strategy: PrefetchStrategy,
        abort: AbortHandle,
        executor: PrefetchFn,
    ) -> Self {
        Self {
            id,
            page,
            priority,
            strategy,
            created_at: Instant::now(),
            abort,
            executor,
        }
    }

    /// Overrides the creation timestamp.
    pub fn with_created_at(mut self, created_at: Instant) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &CommandId {
        &self.id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn priority(&self) -> PrefetchPriority {
        self.priority
    }

    pub fn strategy(&self) -> PrefetchStrategy {
        self.strategy
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// The handle that cancels this command.
    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }

    /// True while the command has not been aborted.
    pub fn can_execute(&self) -> bool {
        !self.abort.is_aborted()
    }

    /// Duration hint derived from the strategy.
    pub fn estimated_duration(&self) -> Duration {
        self.strategy.estimated_duration()
    }

    /// Snapshot for observers and logging.
    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            id: self.id.clone(),
            page: self.page,
            priority: self.priority,
            strategy: self.strategy,
            estimated_duration: self.estimated_duration(),
        }
    }

    /// Runs the executor.
    ///
    /// Fails with [`CommandError::Aborted`] without calling the executor if
    /// the handle is already tripped. Executor failures are returned as
    /// [`CommandError::Executor`]; nothing is retried.
    pub async fn execute(&self) -> Result<(), CommandError> {
        if self.abort.is_aborted() {
            return Err(CommandError::Aborted { page: self.page });
        }
        (self.executor)(self.abort.clone())
            .await
            .map_err(|source| CommandError::Executor {
                page: self.page,
                source,
            })
    }
}

impl fmt::Debug for PrefetchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchCommand")
            .field("id", &self.id)
            .field("page", &self.page)
            .field("priority", &self.priority)
            .field("strategy", &self.strategy)
            .field("aborted", &self.abort.is_aborted())
            .finish_non_exhaustive()
    }
}

/// Wraps a closure returning a future into a [`PrefetchFn`].
pub fn prefetch_fn<F, Fut>(f: F) -> PrefetchFn
where
    F: Fn(AbortHandle) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<(), FetchError>> + Send + 'static,
{
    Arc::new(move |abort| -> BoxFuture<'static, Result<(), FetchError>> { Box::pin(f(abort)) })
}

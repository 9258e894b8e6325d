//! Error types for the prefetch module.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by a page fetcher or command executor.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Plain failure description.
    #[error("{0}")]
    Message(String),

    /// Failure wrapping another error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl FetchError {
    /// Creates a fetch error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wraps an arbitrary error.
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}

/// Errors produced while executing a prefetch command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command's abort handle was tripped before or during execution.
    #[error("Prefetch of page {page} was aborted")]
    Aborted { page: u32 },

    /// The injected executor failed.
    #[error("Prefetch of page {page} failed: {source}")]
    Executor {
        page: u32,
        #[source]
        source: FetchError,
    },

    /// The executor did not settle within the configured command timeout.
    #[error("Prefetch of page {page} timed out after {timeout:?}")]
    TimedOut { page: u32, timeout: Duration },

    /// The executor panicked.
    #[error("Prefetch of page {page} panicked: {message}")]
    Panicked { page: u32, message: String },
}

impl CommandError {
    /// Returns true for the benign abort case.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// The page the failed command was prefetching.
    pub fn page(&self) -> u32 {
        match self {
            Self::Aborted { page }
            | Self::Executor { page, .. }
            | Self::TimedOut { page, .. }
            | Self::Panicked { page, .. } => *page,
        }
    }
}

/// Failure reported by a lifecycle observer callback.
#[derive(Debug, Error)]
#[error("Observer failed: {message}")]
pub struct ObserverError {
    message: String,
}

impl ObserverError {
    /// Creates an observer error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

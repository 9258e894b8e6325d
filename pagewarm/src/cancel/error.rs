//! Error types for the cancellation chain.

use thiserror::Error;

/// Failure reported by a cancellation handler's `execute`.
#[derive(Debug, Error)]
#[error("Cancellation handler '{handler}' failed: {message}")]
pub struct CancellationError {
    pub handler: String,
    pub message: String,
}

impl CancellationError {
    pub fn new(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

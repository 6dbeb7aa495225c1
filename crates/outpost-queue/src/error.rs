//! Error types for the queue abstraction.

use thiserror::Error;

/// Errors a [`crate::client::QueueClient`] can return.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue '{queue}' not found")]
    QueueNotFound { queue: String },

    #[error("message not found for receipt handle '{receipt_handle}'")]
    MessageNotFound { receipt_handle: String },

    #[error("queue '{queue}' is at capacity ({max_size} messages)")]
    CapacityExceeded { queue: String, max_size: usize },

    #[error("queue operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("underlying provider error: {message}")]
    ProviderError { message: String },

    #[error("invalid message: {reason}")]
    InvalidMessage { reason: String },
}

impl QueueError {
    /// Whether a caller should treat this as retryable (NACK and try again)
    /// rather than as a terminal failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QueueError::Timeout { .. }
                | QueueError::ProviderError { .. }
                | QueueError::CapacityExceeded { .. }
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

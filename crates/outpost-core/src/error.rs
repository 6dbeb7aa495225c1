//! The error taxonomy the pipeline propagates, and the recovery strategy
//! each kind implies.

use thiserror::Error;

/// Broad classification used by callers to decide whether to retry,
/// surface to the API edge, or crash the process. Mirrors the
/// `{validation, not_found, conflict, auth, transport_failure,
/// queue_temporary, store_temporary, log_writer_permanent}` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Client-caused; never retried.
    Permanent,
    /// Infrastructure hiccup; safe to retry with backoff.
    Transient,
    /// Signature/authorization failure.
    Security,
    /// Bad runtime configuration; fatal at startup.
    Configuration,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Transient => "transient",
            ErrorCategory::Security => "security",
            ErrorCategory::Configuration => "configuration",
        }
    }
}

#[derive(Debug, Error)]
pub enum OutpostError {
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("authorization failed: {reason}")]
    Auth { reason: String },

    #[error("transport failure delivering to destination: {reason}")]
    TransportFailure { reason: String },

    #[error("queue operation failed transiently: {reason}")]
    QueueTemporary { reason: String },

    #[error("entity/idempotence store operation failed transiently: {reason}")]
    StoreTemporary { reason: String },

    #[error("attempt log write failed permanently: {reason}")]
    LogWriterPermanent { reason: String },

    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },
}

impl OutpostError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            OutpostError::Validation { .. }
            | OutpostError::NotFound { .. }
            | OutpostError::Conflict { .. } => ErrorCategory::Permanent,
            OutpostError::Auth { .. } => ErrorCategory::Security,
            OutpostError::TransportFailure { .. }
            | OutpostError::QueueTemporary { .. }
            | OutpostError::StoreTemporary { .. } => ErrorCategory::Transient,
            OutpostError::LogWriterPermanent { .. } => ErrorCategory::Permanent,
            OutpostError::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Whether the pipeline should retry the operation that produced this
    /// error (NACK and redeliver, or hand to the retry scheduler).
    pub fn should_retry(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

impl From<outpost_queue::QueueError> for OutpostError {
    fn from(err: outpost_queue::QueueError) -> Self {
        if err.is_transient() {
            OutpostError::QueueTemporary {
                reason: err.to_string(),
            }
        } else {
            OutpostError::Validation {
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

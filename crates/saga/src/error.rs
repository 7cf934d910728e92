//! Saga error types.

use std::time::Duration;

use common::SagaId;
use domain::{DomainError, ErrorKind};
use saga_log::SagaLogError;
use thiserror::Error;

use crate::events::Step;

/// Failure of one call to a collaborating service.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// The client does not offer this operation.
    #[error("{operation} is not implemented by this client")]
    Unimplemented { operation: &'static str },

    /// The call did not answer in time. Its remote effect is unknown.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The caller's deadline ran out before the call was made.
    #[error("deadline exceeded before {operation}")]
    DeadlineExceeded { operation: &'static str },

    /// The service answered with an error.
    #[error("{message}")]
    Rejected { kind: ErrorKind, message: String },
}

impl StepError {
    pub fn unimplemented(operation: &'static str) -> Self {
        StepError::Unimplemented { operation }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Unimplemented { .. } => ErrorKind::Internal,
            StepError::Timeout { .. } | StepError::DeadlineExceeded { .. } => {
                ErrorKind::Downstream
            }
            StepError::Rejected { kind, .. } => *kind,
        }
    }

    /// True when the remote side may have applied the call anyway.
    pub fn is_uncertain(&self) -> bool {
        matches!(self, StepError::Timeout { .. })
    }
}

impl From<DomainError> for StepError {
    fn from(err: DomainError) -> Self {
        StepError::Rejected {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Maps any domain service error into a rejected step.
pub fn rejected(err: impl Into<DomainError>) -> StepError {
    StepError::from(err.into())
}

/// Errors that can occur while running or recovering a registration.
#[derive(Debug, Error)]
pub enum SagaError {
    #[error("{0}")]
    Validation(String),

    /// A forward step failed; compensation has already run.
    #[error("Registration step '{step}' failed: {source}")]
    StepFailed {
        step: Step,
        #[source]
        source: StepError,
    },

    #[error("Saga log error: {0}")]
    Log(#[from] SagaLogError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Saga not found: {0}")]
    NotFound(SagaId),

    #[error("Unreadable saga log for {saga_id}: {reason}")]
    CorruptLog { saga_id: SagaId, reason: String },
}

impl SagaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SagaError::Validation(_) => ErrorKind::Validation,
            SagaError::StepFailed { source, .. } => source.kind(),
            SagaError::NotFound(_) => ErrorKind::NotFound,
            SagaError::Log(_) | SagaError::Serialization(_) | SagaError::CorruptLog { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

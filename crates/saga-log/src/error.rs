use thiserror::Error;

use common::SagaId;

use crate::Sequence;

/// Errors raised by saga log backends.
#[derive(Debug, Error)]
pub enum SagaLogError {
    /// Another writer appended to the saga since it was loaded.
    #[error("Concurrency conflict for saga {saga_id}: expected sequence {expected}, found {actual}")]
    ConcurrencyConflict {
        saga_id: SagaId,
        expected: Sequence,
        actual: Sequence,
    },

    /// The batch handed to `append` is malformed.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SagaLogError>;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SagaId;

use crate::{Result, SagaLogEntry, SagaLogError, Sequence};

/// Durable, append-only storage for saga step events.
///
/// Appends are atomic per batch and guarded by optimistic concurrency on the
/// saga's current sequence.
#[async_trait]
pub trait SagaLog: Send + Sync {
    /// Appends entries, failing with `ConcurrencyConflict` unless the saga is
    /// currently at `expected`. Returns the saga's new sequence.
    async fn append(&self, entries: Vec<SagaLogEntry>, expected: Sequence) -> Result<Sequence>;

    /// All entries of one saga, oldest first.
    async fn load(&self, saga_id: SagaId) -> Result<Vec<SagaLogEntry>>;

    /// Sagas of `saga_type` with no closing entry whose latest entry was
    /// recorded before `idle_since`.
    async fn open_sagas(&self, saga_type: &str, idle_since: DateTime<Utc>) -> Result<Vec<SagaId>>;
}

#[async_trait]
pub trait SagaLogExt: SagaLog {
    async fn append_entry(&self, entry: SagaLogEntry, expected: Sequence) -> Result<Sequence> {
        self.append(vec![entry], expected).await
    }

    /// Current sequence of a saga; `Sequence::empty()` when it has no entries.
    async fn current_sequence(&self, saga_id: SagaId) -> Result<Sequence> {
        Ok(self
            .load(saga_id)
            .await?
            .last()
            .map(|e| e.sequence)
            .unwrap_or_default())
    }

    async fn is_closed(&self, saga_id: SagaId) -> Result<bool> {
        Ok(self.load(saga_id).await?.iter().any(|e| e.closes_saga))
    }
}

impl<T: SagaLog + ?Sized> SagaLogExt for T {}

/// Checks that a batch is non-empty, targets a single saga and is numbered
/// consecutively from `expected + 1`.
pub fn validate_append(entries: &[SagaLogEntry], expected: Sequence) -> Result<()> {
    let Some(first) = entries.first() else {
        return Err(SagaLogError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut next = expected.next();
    for entry in entries {
        if entry.saga_id != first.saga_id {
            return Err(SagaLogError::InvalidAppend(
                "all entries must belong to the same saga".to_string(),
            ));
        }
        if entry.saga_type != first.saga_type {
            return Err(SagaLogError::InvalidAppend(
                "all entries must have the same saga type".to_string(),
            ));
        }
        if entry.sequence != next {
            return Err(SagaLogError::InvalidAppend(format!(
                "entries must be sequential: expected {next}, got {}",
                entry.sequence
            )));
        }
        next = next.next();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(saga_id: SagaId, seq: i64) -> SagaLogEntry {
        SagaLogEntry::builder()
            .saga_id(saga_id)
            .saga_type("VendorRegistration")
            .sequence(Sequence::new(seq))
            .entry_type("StepCompleted")
            .payload_raw(serde_json::json!({}))
            .try_build()
            .unwrap()
    }

    #[test]
    fn test_validate_accepts_consecutive_batch() {
        let id = SagaId::new();
        let batch = vec![entry(id, 3), entry(id, 4)];
        assert!(validate_append(&batch, Sequence::new(2)).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_batch() {
        assert!(matches!(
            validate_append(&[], Sequence::empty()),
            Err(SagaLogError::InvalidAppend(_))
        ));
    }

    #[test]
    fn test_validate_rejects_gap() {
        let id = SagaId::new();
        let batch = vec![entry(id, 1), entry(id, 3)];
        assert!(validate_append(&batch, Sequence::empty()).is_err());
    }

    #[test]
    fn test_validate_rejects_mixed_sagas() {
        let batch = vec![entry(SagaId::new(), 1), entry(SagaId::new(), 2)];
        assert!(validate_append(&batch, Sequence::empty()).is_err());
    }
}

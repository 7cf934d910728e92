use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SagaId;
use tokio::sync::RwLock;

use crate::{Result, SagaLog, SagaLogEntry, SagaLogError, Sequence, validate_append};

/// In-memory saga log for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct InMemorySagaLog {
    sagas: Arc<RwLock<HashMap<SagaId, Vec<SagaLogEntry>>>>,
}

impl InMemorySagaLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all sagas.
    pub async fn entry_count(&self) -> usize {
        self.sagas.read().await.values().map(Vec::len).sum()
    }

    /// Ids of every saga with at least one entry, sorted.
    pub async fn saga_ids(&self) -> Vec<SagaId> {
        let mut ids: Vec<SagaId> = self.sagas.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn clear(&self) {
        self.sagas.write().await.clear();
    }
}

#[async_trait]
impl SagaLog for InMemorySagaLog {
    async fn append(&self, entries: Vec<SagaLogEntry>, expected: Sequence) -> Result<Sequence> {
        validate_append(&entries, expected)?;
        let saga_id = entries[0].saga_id;

        let mut sagas = self.sagas.write().await;
        let log = sagas.entry(saga_id).or_default();

        let actual = log.last().map(|e| e.sequence).unwrap_or_default();
        if actual != expected {
            return Err(SagaLogError::ConcurrencyConflict {
                saga_id,
                expected,
                actual,
            });
        }

        let last = entries
            .last()
            .map(|e| e.sequence)
            .unwrap_or(expected);
        log.extend(entries);
        Ok(last)
    }

    async fn load(&self, saga_id: SagaId) -> Result<Vec<SagaLogEntry>> {
        Ok(self
            .sagas
            .read()
            .await
            .get(&saga_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn open_sagas(&self, saga_type: &str, idle_since: DateTime<Utc>) -> Result<Vec<SagaId>> {
        let sagas = self.sagas.read().await;
        let mut open: Vec<SagaId> = sagas
            .iter()
            .filter(|(_, log)| {
                log.first().is_some_and(|e| e.saga_type == saga_type)
                    && !log.iter().any(|e| e.closes_saga)
                    && log.last().is_some_and(|e| e.recorded_at < idle_since)
            })
            .map(|(id, _)| *id)
            .collect();
        open.sort();
        Ok(open)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SagaId;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{Result, SagaLog, SagaLogEntry, SagaLogError, Sequence, validate_append};

/// PostgreSQL-backed saga log.
#[derive(Clone)]
pub struct PostgresSagaLog {
    pool: PgPool,
}

impl PostgresSagaLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_entry(row: PgRow) -> Result<SagaLogEntry> {
        Ok(SagaLogEntry {
            entry_id: row.try_get("id")?,
            saga_id: SagaId::from_uuid(row.try_get::<Uuid, _>("saga_id")?),
            saga_type: row.try_get("saga_type")?,
            sequence: Sequence::new(row.try_get("sequence")?),
            entry_type: row.try_get("entry_type")?,
            recorded_at: row.try_get("recorded_at")?,
            payload: row.try_get("payload")?,
            closes_saga: row.try_get("closes_saga")?,
            correlation_id: row.try_get("correlation_id")?,
        })
    }
}

#[async_trait]
impl SagaLog for PostgresSagaLog {
    #[tracing::instrument(skip(self, entries), fields(count = entries.len()))]
    async fn append(&self, entries: Vec<SagaLogEntry>, expected: Sequence) -> Result<Sequence> {
        validate_append(&entries, expected)?;
        let saga_id = entries[0].saga_id;

        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sequence) FROM saga_log WHERE saga_id = $1")
                .bind(saga_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        let actual = Sequence::new(current.unwrap_or(0));
        if actual != expected {
            return Err(SagaLogError::ConcurrencyConflict {
                saga_id,
                expected,
                actual,
            });
        }

        let mut last = expected;
        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO saga_log (id, saga_id, saga_type, sequence, entry_type, recorded_at, payload, closes_saga, correlation_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(entry.entry_id)
            .bind(entry.saga_id.as_uuid())
            .bind(&entry.saga_type)
            .bind(entry.sequence.as_i64())
            .bind(&entry.entry_type)
            .bind(entry.recorded_at)
            .bind(&entry.payload)
            .bind(entry.closes_saga)
            .bind(&entry.correlation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A concurrent writer won the race for this sequence.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_saga_sequence")
                {
                    return SagaLogError::ConcurrencyConflict {
                        saga_id,
                        expected,
                        actual: entry.sequence,
                    };
                }
                SagaLogError::Database(e)
            })?;
            last = entry.sequence;
        }

        tx.commit().await?;
        metrics::counter!("saga_log_entries_appended_total").increment(entries.len() as u64);
        Ok(last)
    }

    async fn load(&self, saga_id: SagaId) -> Result<Vec<SagaLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, saga_id, saga_type, sequence, entry_type, recorded_at, payload, closes_saga, correlation_id
            FROM saga_log
            WHERE saga_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(saga_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn open_sagas(&self, saga_type: &str, idle_since: DateTime<Utc>) -> Result<Vec<SagaId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT saga_id
            FROM saga_log
            WHERE saga_type = $1
            GROUP BY saga_id
            HAVING NOT bool_or(closes_saga) AND MAX(recorded_at) < $2
            ORDER BY saga_id
            "#,
        )
        .bind(saga_type)
        .bind(idle_since)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(SagaId::from_uuid).collect())
    }
}

use chrono::{DateTime, Utc};
use common::SagaId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of an entry within one saga's log.
///
/// The first entry is at sequence 1; an empty log is at 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Sequence(i64);

impl Sequence {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Sequence of a saga with no entries.
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded fact about a saga's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaLogEntry {
    pub entry_id: Uuid,
    pub saga_id: SagaId,
    /// Kind of saga, e.g. `"VendorRegistration"`.
    pub saga_type: String,
    pub sequence: Sequence,
    /// Tag of the recorded step event, e.g. `"StepCompleted"`.
    pub entry_type: String,
    pub recorded_at: DateTime<Utc>,
    pub payload: serde_json::Value,
    /// Set on the entry that moves the saga into a terminal state.
    pub closes_saga: bool,
    pub correlation_id: Option<String>,
}

impl SagaLogEntry {
    pub fn builder() -> SagaLogEntryBuilder {
        SagaLogEntryBuilder::default()
    }
}

/// Builder for [`SagaLogEntry`].
#[derive(Debug, Default)]
pub struct SagaLogEntryBuilder {
    saga_id: Option<SagaId>,
    saga_type: Option<String>,
    sequence: Option<Sequence>,
    entry_type: Option<String>,
    recorded_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    closes_saga: bool,
    correlation_id: Option<String>,
}

impl SagaLogEntryBuilder {
    pub fn saga_id(mut self, id: SagaId) -> Self {
        self.saga_id = Some(id);
        self
    }

    pub fn saga_type(mut self, saga_type: impl Into<String>) -> Self {
        self.saga_type = Some(saga_type.into());
        self
    }

    pub fn sequence(mut self, sequence: Sequence) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = Some(entry_type.into());
        self
    }

    /// Overrides the recording time (defaults to now).
    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }

    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn closes_saga(mut self, closes: bool) -> Self {
        self.closes_saga = closes;
        self
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Builds the entry, returning `None` if a required field is missing.
    pub fn try_build(self) -> Option<SagaLogEntry> {
        Some(SagaLogEntry {
            entry_id: Uuid::new_v4(),
            saga_id: self.saga_id?,
            saga_type: self.saga_type?,
            sequence: self.sequence?,
            entry_type: self.entry_type?,
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
            payload: self.payload?,
            closes_saga: self.closes_saga,
            correlation_id: self.correlation_id,
        })
    }
}

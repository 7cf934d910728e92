use common::SagaId;
use saga_log::{SagaLog, SagaLogEntry, SagaLogExt, Sequence};

use crate::coordinator::SAGA_TYPE;
use crate::error::SagaError;
use crate::events::RegistrationEvent;
use crate::instance::RegistrationInstance;

/// Appends a saga's events to the log and folds them into its instance.
pub(crate) struct Journal<'a, L: SagaLog + ?Sized> {
    log: &'a L,
    saga_id: SagaId,
    sequence: Sequence,
    correlation_id: String,
    instance: RegistrationInstance,
}

impl<'a, L: SagaLog + ?Sized> Journal<'a, L> {
    pub(crate) fn start(log: &'a L, saga_id: SagaId, correlation_id: &str) -> Self {
        Self {
            log,
            saga_id,
            sequence: Sequence::empty(),
            correlation_id: correlation_id.to_string(),
            instance: RegistrationInstance::new(saga_id),
        }
    }

    /// Continues an existing saga from its recorded entries.
    pub(crate) async fn resume(log: &'a L, saga_id: SagaId) -> Result<Self, SagaError> {
        let entries = log.load(saga_id).await?;
        let Some(last) = entries.last() else {
            return Err(SagaError::NotFound(saga_id));
        };
        let sequence = last.sequence;
        let correlation_id = entries
            .iter()
            .find_map(|e| e.correlation_id.clone())
            .unwrap_or_else(|| saga_id.to_string());
        let instance = RegistrationInstance::from_entries(saga_id, &entries)?;
        Ok(Self {
            log,
            saga_id,
            sequence,
            correlation_id,
            instance,
        })
    }

    pub(crate) async fn record(&mut self, event: RegistrationEvent) -> Result<(), SagaError> {
        let entry = SagaLogEntry::builder()
            .saga_id(self.saga_id)
            .saga_type(SAGA_TYPE)
            .sequence(self.sequence.next())
            .entry_type(event.event_type())
            .payload(&event)?
            .closes_saga(event.closes_saga())
            .correlation_id(self.correlation_id.clone())
            .try_build()
            .ok_or_else(|| SagaError::CorruptLog {
                saga_id: self.saga_id,
                reason: "incomplete log entry".to_string(),
            })?;
        self.sequence = self.log.append_entry(entry, self.sequence).await?;
        self.instance.apply(event);
        Ok(())
    }

    /// Records during compensation, where a log outage must not stop the
    /// undo calls. The event still reaches the in-memory instance.
    pub(crate) async fn record_or_trace(&mut self, event: RegistrationEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.record(event.clone()).await {
            tracing::error!(saga_id = %self.saga_id, event_type, error = %e, "failed to record saga event");
            metrics::counter!("saga_log_failures_total").increment(1);
            self.instance.apply(event);
        }
    }

    pub(crate) fn saga_id(&self) -> SagaId {
        self.saga_id
    }

    pub(crate) fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub(crate) fn instance(&self) -> &RegistrationInstance {
        &self.instance
    }
}

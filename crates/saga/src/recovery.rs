//! Finds registrations that stopped mid-run and compensates them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::SagaId;
use saga_log::SagaLog;
use tokio::task::JoinHandle;

use crate::coordinator::{RegistrationSaga, SAGA_TYPE};
use crate::error::SagaError;
use crate::state::RegistrationState;

/// Result of one recovery pass.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub recovered: Vec<(SagaId, RegistrationState)>,
    pub failed: Vec<(SagaId, String)>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.recovered.is_empty() && self.failed.is_empty()
    }
}

/// Periodic sweep over the saga log.
///
/// A saga counts as interrupted once it has no closing entry and nothing
/// was recorded for `idle_after`; a live saga appends on every step, so the
/// window only has to exceed the registration deadline.
pub struct SagaRecovery<L: SagaLog + ?Sized> {
    saga: Arc<RegistrationSaga<L>>,
    idle_after: chrono::Duration,
}

impl<L: SagaLog + ?Sized + 'static> SagaRecovery<L> {
    pub fn new(saga: Arc<RegistrationSaga<L>>, idle_after: chrono::Duration) -> Self {
        Self { saga, idle_after }
    }

    /// Compensates every interrupted registration once.
    #[tracing::instrument(skip(self), fields(saga_type = SAGA_TYPE))]
    pub async fn run_once(&self) -> Result<RecoveryReport, SagaError> {
        let idle_since = Utc::now() - self.idle_after;
        let open = self.saga.log().open_sagas(SAGA_TYPE, idle_since).await?;
        let mut report = RecoveryReport::default();

        for saga_id in open {
            match self.saga.recover(saga_id).await {
                Ok(state) => {
                    metrics::counter!("sagas_recovered_total").increment(1);
                    report.recovered.push((saga_id, state));
                }
                Err(e) => {
                    tracing::error!(%saga_id, error = %e, "saga recovery failed");
                    report.failed.push((saga_id, e.to_string()));
                }
            }
        }

        if !report.is_empty() {
            tracing::info!(
                recovered = report.recovered.len(),
                failed = report.failed.len(),
                "saga recovery pass finished"
            );
        }
        Ok(report)
    }

    /// Runs a pass every `interval` until the task is aborted.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "saga recovery pass failed");
                }
            }
        })
    }
}

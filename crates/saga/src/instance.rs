//! In-memory view of one registration, rebuilt by folding its log.

use common::{PlanId, SagaId, SubscriptionId, TransactionId, UserId, VendorId};
use domain::identity::UserTx;
use saga_log::SagaLogEntry;

use crate::error::SagaError;
use crate::events::{Compensation, RegistrationEvent, Step};
use crate::state::RegistrationState;

/// The failure that sent a saga into compensation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub step: Step,
    pub error: String,
    pub uncertain: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationInstance {
    saga_id: Option<SagaId>,
    state: RegistrationState,
    email: Option<String>,
    plan_id: Option<PlanId>,
    user_id: Option<UserId>,
    user_tx: Option<u64>,
    vendor_id: Option<VendorId>,
    subscription_id: Option<SubscriptionId>,
    transaction_id: Option<TransactionId>,
    reference: Option<String>,
    payment_url: Option<String>,
    started_steps: Vec<Step>,
    failure: Option<StepFailure>,
    compensated: Vec<Compensation>,
    failed_compensations: Vec<Compensation>,
    closed: bool,
}

impl RegistrationInstance {
    pub fn new(saga_id: SagaId) -> Self {
        Self {
            saga_id: Some(saga_id),
            ..Self::default()
        }
    }

    /// Rebuilds an instance from its log entries, oldest first.
    pub fn from_entries(saga_id: SagaId, entries: &[SagaLogEntry]) -> Result<Self, SagaError> {
        let mut instance = Self::new(saga_id);
        for entry in entries {
            if entry.saga_id != saga_id {
                return Err(SagaError::CorruptLog {
                    saga_id,
                    reason: format!("entry {} belongs to saga {}", entry.sequence, entry.saga_id),
                });
            }
            let event: RegistrationEvent =
                serde_json::from_value(entry.payload.clone()).map_err(|e| {
                    SagaError::CorruptLog {
                        saga_id,
                        reason: format!("entry {}: {e}", entry.sequence),
                    }
                })?;
            instance.apply(event);
        }
        Ok(instance)
    }

    pub fn apply(&mut self, event: RegistrationEvent) {
        match event {
            RegistrationEvent::SagaStarted { email, plan_id, .. } => {
                self.email = Some(email);
                self.plan_id = Some(plan_id);
                self.state = RegistrationState::Init;
            }
            RegistrationEvent::StepStarted { step } => {
                if !self.started_steps.contains(&step) {
                    self.started_steps.push(step);
                }
            }
            RegistrationEvent::UserCreated { user_id, user_tx } => {
                self.user_id = Some(user_id);
                self.user_tx = Some(user_tx);
                self.state = RegistrationState::UserCreated;
            }
            RegistrationEvent::RoleVerified => {}
            RegistrationEvent::VendorProvisioned { vendor_id } => {
                self.vendor_id = Some(vendor_id);
                self.state = RegistrationState::VendorProvisioned;
            }
            RegistrationEvent::SubscriptionCreated { subscription_id } => {
                self.subscription_id = Some(subscription_id);
                self.state = RegistrationState::SubscriptionCreated;
            }
            RegistrationEvent::PaymentInitiated {
                transaction_id,
                reference,
                payment_url,
            } => {
                self.transaction_id = Some(transaction_id);
                self.reference = Some(reference);
                self.payment_url = Some(payment_url);
                self.state = RegistrationState::PaymentInitiated;
            }
            RegistrationEvent::StepFailed {
                step,
                error,
                uncertain,
            } => {
                self.failure = Some(StepFailure {
                    step,
                    error,
                    uncertain,
                });
            }
            RegistrationEvent::CompensationStarted => {
                self.state = RegistrationState::Compensating;
            }
            RegistrationEvent::CompensationStepCompleted { action } => {
                self.failed_compensations.retain(|a| *a != action);
                if !self.compensated.contains(&action) {
                    self.compensated.push(action);
                }
            }
            RegistrationEvent::CompensationStepFailed { action, .. } => {
                if !self.failed_compensations.contains(&action) {
                    self.failed_compensations.push(action);
                }
            }
            RegistrationEvent::SagaCompleted => {
                self.state = RegistrationState::Returned;
                self.closed = true;
            }
            RegistrationEvent::SagaFailed { .. } => {
                self.state = RegistrationState::Failed;
                self.closed = true;
            }
        }
    }

    /// Undo actions still owed, newest step first.
    ///
    /// A step counts once it has started: its call may have landed even if
    /// no answer was recorded.
    pub fn pending_compensations(&self) -> Vec<Compensation> {
        let mut plan = Vec::new();
        if self.has_started(Step::InitiatePayment) {
            plan.push(Compensation::CancelPayment);
        }
        if self.has_started(Step::CreateSubscription) {
            plan.push(Compensation::DiscardSubscription);
        }
        if self.has_started(Step::CreateVendor) {
            plan.push(Compensation::WithdrawVendor);
        }
        if self.user_tx.is_some() {
            plan.push(Compensation::RollbackUser);
        }
        plan.retain(|action| !self.compensated.contains(action));
        plan
    }

    pub fn has_started(&self, step: Step) -> bool {
        self.started_steps.contains(&step)
    }

    /// Most recently started step.
    pub fn current_step(&self) -> Option<Step> {
        self.started_steps.last().copied()
    }

    pub fn saga_id(&self) -> Option<SagaId> {
        self.saga_id
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn plan_id(&self) -> Option<PlanId> {
        self.plan_id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn user_tx(&self) -> Option<UserTx> {
        self.user_tx.map(UserTx::from_id)
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription_id
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn payment_url(&self) -> Option<&str> {
        self.payment_url.as_deref()
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        self.failure.as_ref()
    }

    /// True when `step` failed in a way that may have left a remote effect.
    pub fn failed_uncertainly(&self, step: Step) -> bool {
        self.failure
            .as_ref()
            .is_some_and(|f| f.step == step && f.uncertain)
    }

    pub fn compensated(&self) -> &[Compensation] {
        &self.compensated
    }

    pub fn failed_compensations(&self) -> &[Compensation] {
        &self.failed_compensations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_log::Sequence;

    fn started(instance: &mut RegistrationInstance, step: Step) {
        instance.apply(RegistrationEvent::StepStarted { step });
    }

    fn provisioned_instance() -> RegistrationInstance {
        let mut instance = RegistrationInstance::new(SagaId::new());
        instance.apply(RegistrationEvent::SagaStarted {
            email: "v@x.com".into(),
            plan_id: PlanId::new(),
            provider: None,
        });
        started(&mut instance, Step::CreateUser);
        instance.apply(RegistrationEvent::UserCreated {
            user_id: UserId::new(),
            user_tx: 7,
        });
        started(&mut instance, Step::VerifyRole);
        instance.apply(RegistrationEvent::RoleVerified);
        started(&mut instance, Step::CreateVendor);
        instance.apply(RegistrationEvent::VendorProvisioned {
            vendor_id: VendorId::new(),
        });
        instance
    }

    #[test]
    fn test_fold_tracks_ids_and_state() {
        let instance = provisioned_instance();
        assert_eq!(instance.state(), RegistrationState::VendorProvisioned);
        assert!(instance.user_id().is_some());
        assert_eq!(instance.user_tx().map(|t| t.id()), Some(7));
        assert!(instance.vendor_id().is_some());
        assert_eq!(instance.current_step(), Some(Step::CreateVendor));
        assert!(!instance.is_closed());
    }

    #[test]
    fn test_compensation_plan_runs_newest_first() {
        let mut instance = provisioned_instance();
        started(&mut instance, Step::CreateSubscription);

        assert_eq!(
            instance.pending_compensations(),
            vec![
                Compensation::DiscardSubscription,
                Compensation::WithdrawVendor,
                Compensation::RollbackUser,
            ]
        );
    }

    #[test]
    fn test_completed_compensations_are_not_repeated() {
        let mut instance = provisioned_instance();
        instance.apply(RegistrationEvent::CompensationStarted);
        instance.apply(RegistrationEvent::compensated(Compensation::WithdrawVendor));
        instance.apply(RegistrationEvent::compensation_failed(
            Compensation::RollbackUser,
            "timeout",
        ));

        assert_eq!(instance.state(), RegistrationState::Compensating);
        assert_eq!(instance.pending_compensations(), vec![Compensation::RollbackUser]);
        assert_eq!(instance.failed_compensations(), &[Compensation::RollbackUser]);
    }

    #[test]
    fn test_uncertain_failure_is_remembered() {
        let mut instance = provisioned_instance();
        started(&mut instance, Step::CreateSubscription);
        instance.apply(RegistrationEvent::StepFailed {
            step: Step::CreateSubscription,
            error: "timed out".into(),
            uncertain: true,
        });
        assert!(instance.failed_uncertainly(Step::CreateSubscription));
        assert!(!instance.failed_uncertainly(Step::CreateVendor));
    }

    #[test]
    fn test_from_entries_rejects_foreign_entries() {
        let saga_id = SagaId::new();
        let entry = SagaLogEntry::builder()
            .saga_id(SagaId::new())
            .saga_type("VendorRegistration")
            .sequence(Sequence::new(1))
            .entry_type("RoleVerified")
            .payload(&RegistrationEvent::RoleVerified)
            .unwrap()
            .try_build()
            .unwrap();

        let err = RegistrationInstance::from_entries(saga_id, &[entry]).unwrap_err();
        assert!(matches!(err, SagaError::CorruptLog { .. }));
    }

    #[test]
    fn test_from_entries_folds_payloads() {
        let saga_id = SagaId::new();
        let events = [
            RegistrationEvent::SagaStarted {
                email: "v@x.com".into(),
                plan_id: PlanId::new(),
                provider: Some("paystack".into()),
            },
            RegistrationEvent::StepStarted {
                step: Step::CreateUser,
            },
            RegistrationEvent::SagaFailed {
                reason: "email has been taken".into(),
            },
        ];
        let entries: Vec<_> = events
            .iter()
            .enumerate()
            .map(|(i, event)| {
                SagaLogEntry::builder()
                    .saga_id(saga_id)
                    .saga_type("VendorRegistration")
                    .sequence(Sequence::new(i as i64 + 1))
                    .entry_type(event.event_type())
                    .payload(event)
                    .unwrap()
                    .closes_saga(event.closes_saga())
                    .try_build()
                    .unwrap()
            })
            .collect();

        let instance = RegistrationInstance::from_entries(saga_id, &entries).unwrap();
        assert_eq!(instance.state(), RegistrationState::Failed);
        assert!(instance.is_closed());
        assert_eq!(instance.email(), Some("v@x.com"));
        assert!(instance.pending_compensations().is_empty());
    }
}

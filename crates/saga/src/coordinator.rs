//! Coordinator for the vendor registration saga.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{PlanId, RequestContext, SagaId, SubscriptionId, TransactionId, UserId, VendorId};
use domain::identity::{NewUser, Role};
use domain::payment::{EntityType, InitiateTransaction};
use domain::vendor::NewVendor;
use saga_log::SagaLog;
use serde::{Deserialize, Serialize};

use crate::clients::{PaymentInitiation, SubscriptionLifecycle, UserAccounts, VendorProvisioning};
use crate::error::{SagaError, StepError};
use crate::events::{Compensation, RegistrationEvent, Step};
use crate::journal::Journal;
use crate::state::RegistrationState;

/// Saga type recorded on every log entry.
pub const SAGA_TYPE: &str = "VendorRegistration";

pub const PAYMENT_MESSAGE: &str = "use this link to complete payment";

/// Vendor registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub vendor: VendorInfo,
    pub plan_id: PlanId,
    /// Payment provider; the gateway default when absent.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Store details of the vendor being registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorInfo {
    pub name: String,
    /// Defaults to the user's email.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// What a successful registration hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub saga_id: SagaId,
    pub user_id: UserId,
    pub vendor_id: VendorId,
    pub subscription_id: SubscriptionId,
    pub transaction_id: TransactionId,
    pub reference: String,
    pub payment_url: String,
    pub message: String,
}

/// Time limits for one registration.
#[derive(Debug, Clone, Copy)]
pub struct SagaSettings {
    /// Budget for the whole forward run when the caller set none.
    pub deadline: Duration,
    /// Upper bound for any single forward call.
    pub step_timeout: Duration,
    /// Upper bound for each undo call. Undo runs after the caller's
    /// deadline too.
    pub compensation_timeout: Duration,
}

impl Default for SagaSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            step_timeout: Duration::from_secs(10),
            compensation_timeout: Duration::from_secs(10),
        }
    }
}

/// Why the forward run stopped.
enum Interrupted {
    Step { step: Step, error: StepError },
    Log(SagaError),
}

impl From<SagaError> for Interrupted {
    fn from(err: SagaError) -> Self {
        Interrupted::Log(err)
    }
}

/// Runs vendor registrations: user, vendor, subscription, payment, commit.
///
/// Every step is recorded before it runs. When a step fails, the steps that
/// started are undone newest first and the saga closes as failed.
pub struct RegistrationSaga<L: SagaLog + ?Sized> {
    log: Arc<L>,
    users: Arc<dyn UserAccounts>,
    vendors: Arc<dyn VendorProvisioning>,
    subscriptions: Arc<dyn SubscriptionLifecycle>,
    payments: Arc<dyn PaymentInitiation>,
    settings: SagaSettings,
}

impl<L: SagaLog + ?Sized> RegistrationSaga<L> {
    pub fn new(
        log: Arc<L>,
        users: Arc<dyn UserAccounts>,
        vendors: Arc<dyn VendorProvisioning>,
        subscriptions: Arc<dyn SubscriptionLifecycle>,
        payments: Arc<dyn PaymentInitiation>,
    ) -> Self {
        Self {
            log,
            users,
            vendors,
            subscriptions,
            payments,
            settings: SagaSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SagaSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SagaSettings {
        &self.settings
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Registers a vendor and returns the URL where the first payment is made.
    ///
    /// The caller's deadline, or the configured one, bounds the forward run.
    #[tracing::instrument(
        skip(self, ctx, input),
        fields(saga_type = SAGA_TYPE, correlation_id = %ctx.correlation_id(), email = %input.email)
    )]
    pub async fn register(
        &self,
        ctx: &RequestContext,
        input: VendorRegistration,
    ) -> Result<RegistrationOutcome, SagaError> {
        if input.vendor.name.trim().is_empty() {
            return Err(SagaError::Validation("vendor name must be provided".into()));
        }
        if input
            .provider
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(SagaError::Validation("provider must not be blank".into()));
        }

        let ctx = match ctx.deadline() {
            Some(_) => ctx.clone(),
            None => ctx.clone().with_timeout(self.settings.deadline),
        };
        let started = Instant::now();
        let saga_id = SagaId::new();
        let mut journal = Journal::start(self.log.as_ref(), saga_id, ctx.correlation_id());
        journal
            .record(RegistrationEvent::SagaStarted {
                email: input.email.clone(),
                plan_id: input.plan_id,
                provider: input.provider.clone(),
            })
            .await?;
        tracing::info!(%saga_id, "registration saga started");

        let result = self.run_forward(&ctx, &input, &mut journal).await;
        metrics::histogram!("saga_duration_seconds", "saga_type" => SAGA_TYPE)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                metrics::counter!("vendor_registrations_total", "outcome" => "completed")
                    .increment(1);
                tracing::info!(%saga_id, vendor_id = %outcome.vendor_id, "registration saga completed");
                Ok(outcome)
            }
            Err(Interrupted::Step { step, error }) => {
                metrics::counter!("vendor_registrations_total", "outcome" => "failed").increment(1);
                tracing::warn!(%saga_id, %step, error = %error, "registration step failed");
                journal
                    .record_or_trace(RegistrationEvent::step_failed(step, &error))
                    .await;
                self.compensate(&mut journal).await;
                Err(SagaError::StepFailed {
                    step,
                    source: error,
                })
            }
            Err(Interrupted::Log(err)) => {
                metrics::counter!("vendor_registrations_total", "outcome" => "failed").increment(1);
                tracing::error!(%saga_id, error = %err, "saga log unavailable, compensating");
                self.compensate(&mut journal).await;
                Err(err)
            }
        }
    }

    async fn run_forward(
        &self,
        ctx: &RequestContext,
        input: &VendorRegistration,
        journal: &mut Journal<'_, L>,
    ) -> Result<RegistrationOutcome, Interrupted> {
        // 1. Stage the user inside a local transaction
        let pending = self
            .step(ctx, journal, Step::CreateUser, |call| {
                let users = self.users.clone();
                let user = NewUser {
                    name: input.name.clone(),
                    email: input.email.clone(),
                    password: input.password.clone(),
                };
                async move { users.begin(&call, user, Role::Vendor).await }
            })
            .await?;
        let user_id = pending.user.id;
        journal
            .record(RegistrationEvent::UserCreated {
                user_id,
                user_tx: pending.tx.id(),
            })
            .await?;

        // 2. Confirm the role write inside that transaction
        self.step(ctx, journal, Step::VerifyRole, |call| {
            let users = self.users.clone();
            let tx = pending.tx;
            async move { users.ensure_role(&call, tx, user_id, Role::Vendor).await }
        })
        .await?;
        journal.record(RegistrationEvent::RoleVerified).await?;

        // 3. Vendor record, pending payment
        let vendor_id = self
            .step(ctx, journal, Step::CreateVendor, |call| {
                let vendors = self.vendors.clone();
                let new_vendor = NewVendor {
                    email: input
                        .vendor
                        .email
                        .clone()
                        .unwrap_or_else(|| pending.user.email.clone()),
                    name: input.vendor.name.clone(),
                    phone: input.vendor.phone.clone(),
                    user_id,
                };
                async move { vendors.create_vendor(&call, new_vendor).await }
            })
            .await?;
        journal
            .record(RegistrationEvent::VendorProvisioned { vendor_id })
            .await?;

        // 4. Unpaid subscription against the plan
        let subscription = self
            .step(ctx, journal, Step::CreateSubscription, |call| {
                let subscriptions = self.subscriptions.clone();
                let plan_id = input.plan_id;
                async move {
                    subscriptions
                        .create_vendor_plan_subscription(&call, plan_id, vendor_id)
                        .await
                }
            })
            .await?;
        journal
            .record(RegistrationEvent::SubscriptionCreated {
                subscription_id: subscription.id,
            })
            .await?;

        // 5. Payment for the subscription amount
        let saga_id = journal.saga_id();
        let transaction = self
            .step(ctx, journal, Step::InitiatePayment, |call| {
                let payments = self.payments.clone();
                let provider = input.provider.clone();
                let charge = InitiateTransaction {
                    amount: subscription.amount,
                    entity_id: subscription.id.to_string(),
                    entity_type: EntityType::VendorSubscription,
                    email: pending.user.email.clone(),
                    metadata: HashMap::from([
                        ("vendorId".to_string(), vendor_id.to_string()),
                        ("userId".to_string(), user_id.to_string()),
                        ("planId".to_string(), subscription.plan_id.to_string()),
                        ("sagaId".to_string(), saga_id.to_string()),
                    ]),
                };
                async move {
                    payments
                        .initiate_transaction(&call, provider.as_deref(), charge)
                        .await
                }
            })
            .await?;
        journal
            .record(RegistrationEvent::PaymentInitiated {
                transaction_id: transaction.id,
                reference: transaction.reference.clone(),
                payment_url: transaction.payment_url.clone(),
            })
            .await?;

        // 6. Make the user visible
        self.step(ctx, journal, Step::CommitUser, |call| {
            let users = self.users.clone();
            let tx = pending.tx;
            async move { users.commit(&call, tx).await }
        })
        .await?;
        journal.record(RegistrationEvent::SagaCompleted).await?;

        Ok(RegistrationOutcome {
            saga_id,
            user_id,
            vendor_id,
            subscription_id: subscription.id,
            transaction_id: transaction.id,
            reference: transaction.reference,
            payment_url: transaction.payment_url,
            message: PAYMENT_MESSAGE.to_string(),
        })
    }

    /// Records the step, then runs the call bounded by the smaller of the
    /// step timeout and what is left of the deadline.
    async fn step<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        journal: &mut Journal<'_, L>,
        step: Step,
        call: F,
    ) -> Result<T, Interrupted>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<T, StepError>>,
    {
        let budget = match ctx.remaining() {
            Some(remaining) => remaining.min(self.settings.step_timeout),
            None => self.settings.step_timeout,
        };
        if budget.is_zero() {
            return Err(Interrupted::Step {
                step,
                error: StepError::DeadlineExceeded {
                    operation: step.as_str(),
                },
            });
        }

        journal.record(RegistrationEvent::StepStarted { step }).await?;
        tracing::debug!(%step, ?budget, "saga step started");

        let call_ctx = ctx.clone().with_timeout(budget);
        bounded(step.as_str(), budget, call(call_ctx))
            .await
            .map_err(|error| Interrupted::Step { step, error })
    }

    /// Undoes every started step, newest first, and closes the saga.
    ///
    /// Each undo is idempotent; a failed one is recorded and the rest still
    /// run. Log outages are traced rather than returned.
    async fn compensate(&self, journal: &mut Journal<'_, L>) -> RegistrationState {
        if journal.instance().state() != RegistrationState::Compensating {
            journal
                .record_or_trace(RegistrationEvent::CompensationStarted)
                .await;
        }
        let ctx = RequestContext::new(journal.correlation_id());
        let plan = journal.instance().pending_compensations();
        tracing::info!(saga_id = %journal.saga_id(), steps = plan.len(), "compensating registration");

        for action in plan {
            let outcome = self.undo(&ctx, journal, action).await;
            match outcome {
                Ok(()) => {
                    metrics::counter!("saga_compensations_total", "action" => action.as_str(), "outcome" => "completed")
                        .increment(1);
                    journal
                        .record_or_trace(RegistrationEvent::compensated(action))
                        .await;
                }
                Err(reason) => {
                    metrics::counter!("saga_compensations_total", "action" => action.as_str(), "outcome" => "failed")
                        .increment(1);
                    tracing::error!(saga_id = %journal.saga_id(), %action, %reason, "compensation failed");
                    journal
                        .record_or_trace(RegistrationEvent::compensation_failed(action, reason))
                        .await;
                }
            }
        }

        let reason = journal
            .instance()
            .failure()
            .map(|f| format!("{} failed: {}", f.step, f.error))
            .unwrap_or_else(|| "saga log unavailable".to_string());
        journal
            .record_or_trace(RegistrationEvent::SagaFailed { reason })
            .await;
        journal.instance().state()
    }

    async fn undo(
        &self,
        ctx: &RequestContext,
        journal: &Journal<'_, L>,
        action: Compensation,
    ) -> Result<(), String> {
        let instance = journal.instance();
        let timeout = self.settings.compensation_timeout;
        let call = ctx.clone().with_timeout(timeout);

        match action {
            Compensation::CancelPayment => {
                let cancelled = match (instance.reference(), instance.subscription_id()) {
                    (Some(reference), _) => {
                        bounded(
                            "CancelTransaction",
                            timeout,
                            self.payments.cancel_transaction(&call, reference),
                        )
                        .await
                    }
                    (None, Some(subscription_id)) => {
                        let entity_id = subscription_id.to_string();
                        bounded(
                            "CancelPendingTransaction",
                            timeout,
                            self.payments.cancel_pending_for_entity(
                                &call,
                                &entity_id,
                                EntityType::VendorSubscription,
                            ),
                        )
                        .await
                    }
                    (None, None) => Ok(false),
                };
                cancelled.map(drop).map_err(|e| e.to_string())
            }
            Compensation::DiscardSubscription => match instance.subscription_id() {
                Some(id) => bounded(
                    "DiscardSubscription",
                    timeout,
                    self.subscriptions.discard_subscription(&call, id),
                )
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
                // Created remotely, but the id never reached the log.
                None if instance.failure().is_none_or(|f| f.uncertain) => {
                    Err("subscription id unknown; left for the orphan audit".to_string())
                }
                None => Ok(()),
            },
            Compensation::WithdrawVendor => match instance.user_id() {
                Some(user_id) => bounded(
                    "WithdrawVendor",
                    timeout,
                    self.vendors.withdraw_vendor_for_user(&call, user_id),
                )
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
                None => Ok(()),
            },
            Compensation::RollbackUser => match instance.user_tx() {
                Some(tx) => bounded("RollbackUser", timeout, self.users.rollback(&call, tx))
                    .await
                    .map_err(|e| e.to_string()),
                None => Ok(()),
            },
        }
    }

    /// Compensates a saga that stopped without closing, e.g. because the
    /// process died mid-run. Closed sagas are left alone.
    #[tracing::instrument(skip(self), fields(saga_type = SAGA_TYPE))]
    pub async fn recover(&self, saga_id: SagaId) -> Result<RegistrationState, SagaError> {
        let mut journal = Journal::resume(self.log.as_ref(), saga_id).await?;
        if journal.instance().is_closed() {
            return Ok(journal.instance().state());
        }

        if journal.instance().state() != RegistrationState::Compensating
            && let Some(step) = journal.instance().current_step()
        {
            journal
                .record(RegistrationEvent::StepFailed {
                    step,
                    error: "interrupted".to_string(),
                    uncertain: true,
                })
                .await?;
        }

        tracing::warn!(%saga_id, state = %journal.instance().state(), "recovering interrupted registration");
        Ok(self.compensate(&mut journal).await)
    }
}

/// Runs `fut` under `budget`; running out counts as an uncertain failure.
async fn bounded<T>(
    operation: &'static str,
    budget: Duration,
    fut: impl Future<Output = Result<T, StepError>>,
) -> Result<T, StepError> {
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(StepError::Timeout {
            operation,
            after: budget,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), StepError> = bounded("Slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.is_uncertain());
        assert!(err.to_string().starts_with("Slow timed out"));
    }

    #[tokio::test]
    async fn test_bounded_passes_through_results() {
        let ok = bounded("Fast", Duration::from_secs(1), async { Ok(5) }).await;
        assert_eq!(ok.unwrap(), 5);
    }

    #[test]
    fn test_registration_payload_is_camel_case() {
        let json = serde_json::json!({
            "name": "Ada",
            "email": "ada@shop.example",
            "password": "correct horse",
            "planId": PlanId::new(),
            "vendor": {"name": "Ada's Shop", "phone": "+2348000000000"}
        });
        let input: VendorRegistration = serde_json::from_value(json).unwrap();
        assert_eq!(input.vendor.phone.as_deref(), Some("+2348000000000"));
        assert!(input.vendor.email.is_none());
        assert!(input.provider.is_none());
    }
}

//! End-to-end registration sagas over the in-process services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{Money, PlanId, RequestContext, SubscriptionId, UserId, VendorId};
use domain::ErrorKind;
use domain::identity::{IdentityService, InMemoryUserStore, Role};
use domain::payment::{
    ChargeRequest, EntityType, InMemoryTransactionStore, Initiated, PaymentError, PaymentGateway,
    PaymentProvider, PaystackConfig, PaystackProvider, ProviderRegistry, TransactionStatus,
    WebhookEvent, WebhookHeaders, WebhookReceipt, paystack,
};
use domain::subscription::{
    InMemorySubscriptionStore, NewPlan, PaymentCompletedHandler, SubscriptionInstance,
    SubscriptionService,
};
use domain::vendor::{InMemoryVendorStore, NewVendor, VendorDirectory, VendorStatus};
use event_bus::{EventBus, InMemoryEventBus, Topic, events};
use saga::{
    Compensation, OrphanAudit, PAYMENT_MESSAGE, RegistrationEvent, RegistrationInstance,
    RegistrationSaga, RegistrationState, SagaError, SagaRecovery, SagaSettings, Step, StepError,
    SubscriptionLifecycle, VendorInfo, VendorProvisioning, VendorRegistration,
};
use saga_log::{InMemorySagaLog, SagaLog};
use tokio::sync::Notify;

const SECRET: &str = "sk_test_registration";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Succeed,
    Fail,
    Hang,
}

/// Answers initiation from a script; webhooks are verified like Paystack's.
struct ScriptedProvider {
    mode: Mutex<Mode>,
    reached: Notify,
    webhooks: PaystackProvider,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            mode: Mutex::new(Mode::Succeed),
            reached: Notify::new(),
            webhooks: PaystackProvider::new(PaystackConfig::new(SECRET)),
        }
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        PaystackProvider::NAME
    }

    async fn initiate(&self, charge: &ChargeRequest) -> Result<Initiated, PaymentError> {
        let mode = *self.mode.lock().unwrap();
        self.reached.notify_one();
        match mode {
            Mode::Succeed => Ok(Initiated {
                payment_url: format!("https://checkout.test/{}", charge.reference),
                metadata: HashMap::new(),
            }),
            Mode::Fail => Err(PaymentError::provider(PaystackProvider::NAME, "card network down")),
            Mode::Hang => std::future::pending().await,
        }
    }

    fn parse_webhook(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> Result<WebhookEvent, PaymentError> {
        self.webhooks.parse_webhook(headers, body)
    }

    fn recognizes(&self, body: &serde_json::Value) -> bool {
        self.webhooks.recognizes(body)
    }
}

type Identity = IdentityService<InMemoryUserStore>;
type Vendors = VendorDirectory<InMemoryVendorStore>;
type Subscriptions = SubscriptionService<InMemorySubscriptionStore>;
type Gateway = PaymentGateway<InMemoryTransactionStore>;

struct Harness {
    bus: InMemoryEventBus,
    log: Arc<InMemorySagaLog>,
    identity: Arc<Identity>,
    vendors: Arc<Vendors>,
    subscriptions: Arc<Subscriptions>,
    gateway: Arc<Gateway>,
    provider: Arc<ScriptedProvider>,
    plan_id: PlanId,
}

impl Harness {
    async fn new() -> Self {
        let bus = InMemoryEventBus::new();
        let shared: Arc<dyn EventBus> = Arc::new(bus.clone());
        let provider = Arc::new(ScriptedProvider::new());
        let registry = ProviderRegistry::builder()
            .register(provider.clone())
            .build()
            .unwrap();
        let subscriptions = Arc::new(SubscriptionService::new(
            InMemorySubscriptionStore::new(),
            shared.clone(),
        ));
        let plan = subscriptions
            .create_vendor_plan(NewPlan {
                name: "Starter".into(),
                content: "List up to 10 products".into(),
                price: Money::from_major(5000),
                user_interactions_allowed: 100,
                duration_secs: 30 * 24 * 3600,
            })
            .await
            .unwrap();

        Self {
            log: Arc::new(InMemorySagaLog::new()),
            identity: Arc::new(IdentityService::new(InMemoryUserStore::new())),
            vendors: Arc::new(VendorDirectory::new(InMemoryVendorStore::new())),
            gateway: Arc::new(PaymentGateway::new(
                InMemoryTransactionStore::new(),
                Arc::new(registry),
                shared,
            )),
            subscriptions,
            provider,
            plan_id: plan.id,
            bus,
        }
    }

    fn saga(&self) -> RegistrationSaga<InMemorySagaLog> {
        self.saga_with(self.vendors.clone(), self.subscriptions.clone())
    }

    fn saga_with(
        &self,
        vendors: Arc<dyn VendorProvisioning>,
        subscriptions: Arc<dyn SubscriptionLifecycle>,
    ) -> RegistrationSaga<InMemorySagaLog> {
        RegistrationSaga::new(
            self.log.clone(),
            self.identity.clone(),
            vendors,
            subscriptions,
            self.gateway.clone(),
        )
        .with_settings(SagaSettings {
            deadline: Duration::from_secs(5),
            step_timeout: Duration::from_millis(200),
            compensation_timeout: Duration::from_millis(200),
        })
    }

    fn registration(&self, email: &str) -> VendorRegistration {
        VendorRegistration {
            name: "Ada".into(),
            email: email.into(),
            password: "correct horse".into(),
            vendor: VendorInfo {
                name: "Ada's Shop".into(),
                email: None,
                phone: Some("+2348000000000".into()),
            },
            plan_id: self.plan_id,
            provider: None,
        }
    }

    async fn events_of(&self, saga_id: common::SagaId) -> Vec<RegistrationEvent> {
        self.log
            .load(saga_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| serde_json::from_value(e.payload).unwrap())
            .collect()
    }

    async fn only_saga(&self) -> common::SagaId {
        let mut open = self
            .log
            .open_sagas(saga::SAGA_TYPE, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(open.len(), 1, "expected exactly one open saga");
        open.remove(0)
    }

    async fn assert_nothing_left(&self) {
        assert_eq!(self.identity.store().user_count().await, 0);
        assert_eq!(self.identity.store().open_transactions().await, 0);
        assert_eq!(self.vendors.store().live_count().await, 0);
        assert_eq!(self.subscriptions.store().subscription_count().await, 0);
        assert_eq!(self.gateway.store().pending_count().await, 0);
    }
}

#[tokio::test]
async fn registration_returns_payment_url_and_leaves_one_of_each() {
    let h = Harness::new().await;
    let ctx = RequestContext::new("req-happy");

    let outcome = h
        .saga()
        .register(&ctx, h.registration("ada@shop.example"))
        .await
        .unwrap();

    assert_eq!(outcome.message, PAYMENT_MESSAGE);
    assert!(outcome.payment_url.starts_with("https://checkout.test/"));

    let user = h.identity.get_user(outcome.user_id).await.unwrap();
    assert_eq!(user.email, "ada@shop.example");
    let roles = h.identity.roles_of(outcome.user_id).await.unwrap();
    assert!(roles.iter().any(|r| r.role == Role::Vendor && !r.is_active));

    let vendor = h.vendors.get_vendor(outcome.vendor_id).await.unwrap();
    assert_eq!(vendor.status, VendorStatus::PendingPayment);
    assert_eq!(vendor.email, "ada@shop.example");
    assert_eq!(vendor.user_id, outcome.user_id);

    let sub = h
        .subscriptions
        .get_subscription(outcome.subscription_id)
        .await
        .unwrap();
    assert!(!sub.has_paid);
    assert_eq!(sub.vendor_id, outcome.vendor_id);

    let tx = h.gateway.get_transaction(outcome.transaction_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.entity_id, outcome.subscription_id.to_string());
    assert_eq!(tx.entity_type, EntityType::VendorSubscription);
    assert_eq!(tx.amount, Money::from_major(5000));
    assert_eq!(tx.metadata.get("vendorId"), Some(&outcome.vendor_id.to_string()));

    assert_eq!(h.vendors.store().live_count().await, 1);
    assert_eq!(h.subscriptions.store().subscription_count().await, 1);
    assert_eq!(h.gateway.store().pending_count().await, 1);

    let entries = h.log.load(outcome.saga_id).await.unwrap();
    assert!(entries.last().unwrap().closes_saga);
    assert!(entries
        .iter()
        .all(|e| e.correlation_id.as_deref() == Some("req-happy")));
    let instance = RegistrationInstance::from_entries(outcome.saga_id, &entries).unwrap();
    assert_eq!(instance.state(), RegistrationState::Returned);
}

#[tokio::test]
async fn payment_failure_compensates_everything() {
    let h = Harness::new().await;
    h.provider.set_mode(Mode::Fail);

    let err = h
        .saga()
        .register(&RequestContext::new("req-fail"), h.registration("ada@shop.example"))
        .await
        .unwrap_err();

    match &err {
        SagaError::StepFailed { step, source } => {
            assert_eq!(*step, Step::InitiatePayment);
            assert_eq!(source.kind(), ErrorKind::Downstream);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Downstream);
    h.assert_nothing_left().await;

    // A withdrawn vendor is kept for the record.
    let all = h.vendors.store().all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, VendorStatus::Withdrawn);

    // The same email may register again once the first attempt is undone.
    h.provider.set_mode(Mode::Succeed);
    h.saga()
        .register(&RequestContext::new("req-retry"), h.registration("ada@shop.example"))
        .await
        .unwrap();
}

#[tokio::test]
async fn compensation_is_recorded_newest_first() {
    let h = Harness::new().await;
    h.provider.set_mode(Mode::Fail);
    let _ = h
        .saga()
        .register(&RequestContext::new("req-log"), h.registration("ada@shop.example"))
        .await;

    let open = h
        .log
        .open_sagas(saga::SAGA_TYPE, Utc::now() + chrono::Duration::hours(1))
        .await
        .unwrap();
    assert!(open.is_empty(), "failed sagas are closed");

    let saga_id = h.log.saga_ids().await[0];
    let compensations: Vec<Compensation> = h
        .events_of(saga_id)
        .await
        .into_iter()
        .filter_map(|e| match e {
            RegistrationEvent::CompensationStepCompleted { action } => Some(action),
            _ => None,
        })
        .collect();
    assert_eq!(
        compensations,
        vec![
            Compensation::CancelPayment,
            Compensation::DiscardSubscription,
            Compensation::WithdrawVendor,
            Compensation::RollbackUser,
        ]
    );
    assert!(matches!(
        h.events_of(saga_id).await.last(),
        Some(RegistrationEvent::SagaFailed { .. })
    ));
}

#[tokio::test]
async fn taken_email_is_a_conflict_without_side_effects() {
    let h = Harness::new().await;
    h.saga()
        .register(&RequestContext::new("req-1"), h.registration("ada@shop.example"))
        .await
        .unwrap();

    let err = h
        .saga()
        .register(&RequestContext::new("req-2"), h.registration("ADA@shop.example"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(
        err,
        SagaError::StepFailed {
            step: Step::CreateUser,
            ..
        }
    ));
    assert_eq!(h.vendors.store().live_count().await, 1);
    assert_eq!(h.subscriptions.store().subscription_count().await, 1);
}

#[tokio::test]
async fn blank_vendor_name_is_rejected_before_any_step() {
    let h = Harness::new().await;
    let mut input = h.registration("ada@shop.example");
    input.vendor.name = "  ".into();

    let err = h
        .saga()
        .register(&RequestContext::new("req-1"), input)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.log.entry_count().await, 0);
}

#[tokio::test]
async fn inactive_plan_fails_at_subscription_and_withdraws_vendor() {
    let h = Harness::new().await;
    h.subscriptions
        .set_plans_active(&[h.plan_id], false)
        .await
        .unwrap();

    let err = h
        .saga()
        .register(&RequestContext::new("req-1"), h.registration("ada@shop.example"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SagaError::StepFailed {
            step: Step::CreateSubscription,
            ..
        }
    ));
    h.assert_nothing_left().await;
}

/// Creates the vendor, then answers too late.
struct LateVendors {
    inner: Arc<Vendors>,
    delay: Duration,
}

#[async_trait]
impl VendorProvisioning for LateVendors {
    async fn create_vendor(
        &self,
        ctx: &RequestContext,
        input: NewVendor,
    ) -> Result<VendorId, StepError> {
        let id = VendorProvisioning::create_vendor(self.inner.as_ref(), ctx, input).await?;
        tokio::time::sleep(self.delay).await;
        Ok(id)
    }

    async fn withdraw_vendor_for_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<Option<VendorId>, StepError> {
        VendorProvisioning::withdraw_vendor_for_user(self.inner.as_ref(), ctx, user_id).await
    }
}

#[tokio::test]
async fn step_timeout_still_undoes_hidden_remote_success() {
    let h = Harness::new().await;
    let vendors = Arc::new(LateVendors {
        inner: h.vendors.clone(),
        delay: Duration::from_secs(2),
    });

    let err = h
        .saga_with(vendors, h.subscriptions.clone())
        .register(&RequestContext::new("req-slow"), h.registration("ada@shop.example"))
        .await
        .unwrap_err();

    match err {
        SagaError::StepFailed { step, source } => {
            assert_eq!(step, Step::CreateVendor);
            assert!(source.is_uncertain());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The vendor was created behind the timeout and withdrawn by user id.
    assert_eq!(h.vendors.store().live_count().await, 0);
    assert_eq!(h.vendors.store().all().await.len(), 1);
    h.assert_nothing_left().await;
}

#[tokio::test]
async fn exhausted_deadline_stops_before_the_next_call() {
    let h = Harness::new().await;
    let vendors = Arc::new(LateVendors {
        inner: h.vendors.clone(),
        delay: Duration::from_millis(150),
    });
    let ctx = RequestContext::new("req-deadline").with_timeout(Duration::from_millis(100));

    let err = h
        .saga_with(vendors, h.subscriptions.clone())
        .register(&ctx, h.registration("ada@shop.example"))
        .await
        .unwrap_err();

    // Vendor creation is cut at the caller's deadline, not the step timeout.
    match err {
        SagaError::StepFailed { step, source } => {
            assert_eq!(step, Step::CreateVendor);
            match source {
                StepError::Timeout { after, .. } => assert!(after <= Duration::from_millis(100)),
                other => panic!("unexpected step error: {other:?}"),
            }
        }
        other => panic!("unexpected error: {other:?}"),
    }
    h.assert_nothing_left().await;
}

#[tokio::test]
async fn recovery_compensates_an_interrupted_saga() {
    let h = Harness::new().await;
    h.provider.set_mode(Mode::Hang);
    let saga = Arc::new(h.saga().with_settings(SagaSettings {
        deadline: Duration::from_secs(60),
        step_timeout: Duration::from_secs(60),
        compensation_timeout: Duration::from_millis(200),
    }));

    // Simulate a crash while the payment call is in flight.
    let running = {
        let saga = saga.clone();
        let input = h.registration("ada@shop.example");
        tokio::spawn(async move { saga.register(&RequestContext::new("req-crash"), input).await })
    };
    h.provider.reached.notified().await;
    running.abort();
    let _ = running.await;

    assert_eq!(h.vendors.store().live_count().await, 1);
    assert_eq!(h.subscriptions.store().subscription_count().await, 1);
    assert_eq!(h.identity.store().open_transactions().await, 1);
    let saga_id = h.only_saga().await;

    h.provider.set_mode(Mode::Succeed);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let recovery = SagaRecovery::new(saga.clone(), chrono::Duration::milliseconds(10));
    let report = recovery.run_once().await.unwrap();

    assert_eq!(report.recovered, vec![(saga_id, RegistrationState::Failed)]);
    assert!(report.failed.is_empty());
    h.assert_nothing_left().await;

    let events = h.events_of(saga_id).await;
    assert!(events.contains(&RegistrationEvent::StepFailed {
        step: Step::InitiatePayment,
        error: "interrupted".into(),
        uncertain: true,
    }));

    // A second pass has nothing to do.
    assert!(recovery.run_once().await.unwrap().is_empty());
}

#[tokio::test]
async fn recovery_leaves_live_and_closed_sagas_alone() {
    let h = Harness::new().await;
    let saga = Arc::new(h.saga());
    saga.register(&RequestContext::new("req-ok"), h.registration("ada@shop.example"))
        .await
        .unwrap();

    let report = SagaRecovery::new(saga, chrono::Duration::zero())
        .run_once()
        .await
        .unwrap();
    assert!(report.is_empty());
    assert_eq!(h.vendors.store().live_count().await, 1);
}

/// Subscription client whose undo is broken.
struct StickySubscriptions {
    inner: Arc<Subscriptions>,
}

#[async_trait]
impl SubscriptionLifecycle for StickySubscriptions {
    async fn create_vendor_plan_subscription(
        &self,
        ctx: &RequestContext,
        plan_id: PlanId,
        vendor_id: VendorId,
    ) -> Result<SubscriptionInstance, StepError> {
        SubscriptionLifecycle::create_vendor_plan_subscription(
            self.inner.as_ref(),
            ctx,
            plan_id,
            vendor_id,
        )
        .await
    }
}

#[tokio::test]
async fn failed_compensation_leaves_an_orphan_the_audit_finds() {
    let h = Harness::new().await;
    h.provider.set_mode(Mode::Fail);
    let subscriptions = Arc::new(StickySubscriptions {
        inner: h.subscriptions.clone(),
    });

    let _ = h
        .saga_with(h.vendors.clone(), subscriptions)
        .register(&RequestContext::new("req-orphan"), h.registration("ada@shop.example"))
        .await
        .unwrap_err();

    let saga_id = h.log.saga_ids().await[0];
    let instance = RegistrationInstance::from_entries(saga_id, &h.log.load(saga_id).await.unwrap())
        .unwrap();
    assert_eq!(instance.state(), RegistrationState::Failed);
    assert_eq!(
        instance.failed_compensations(),
        &[Compensation::DiscardSubscription]
    );
    // The other undo steps still ran.
    assert_eq!(h.vendors.store().live_count().await, 0);
    assert_eq!(h.identity.store().open_transactions().await, 0);

    let orphan_id = instance.subscription_id().unwrap();
    let audit = OrphanAudit::new(
        h.subscriptions.clone(),
        h.gateway.clone(),
        chrono::Duration::zero(),
    );
    let orphans = audit.run(&RequestContext::new("audit")).await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].subscription_id, orphan_id);

    // Subscriptions inside the grace period are not reported yet.
    let patient = OrphanAudit::new(
        h.subscriptions.clone(),
        h.gateway.clone(),
        chrono::Duration::hours(1),
    );
    assert!(patient.run(&RequestContext::new("audit")).await.unwrap().is_empty());
}

#[tokio::test]
async fn audit_ignores_subscriptions_with_transactions() {
    let h = Harness::new().await;
    h.saga()
        .register(&RequestContext::new("req-1"), h.registration("ada@shop.example"))
        .await
        .unwrap();

    let audit = OrphanAudit::new(
        h.subscriptions.clone(),
        h.gateway.clone(),
        chrono::Duration::zero(),
    );
    assert!(audit.run(&RequestContext::new("audit")).await.unwrap().is_empty());
}

#[tokio::test]
async fn signed_webhook_marks_the_subscription_paid() {
    let h = Harness::new().await;
    let shared: Arc<dyn EventBus> = Arc::new(h.bus.clone());
    h.bus
        .subscribe(
            Topic::Payment,
            "subscription",
            Arc::new(PaymentCompletedHandler::new(h.subscriptions.clone(), shared)),
        )
        .await
        .unwrap();

    let outcome = h
        .saga()
        .register(&RequestContext::new("req-register"), h.registration("ada@shop.example"))
        .await
        .unwrap();

    let body = serde_json::json!({
        "event": "charge.success",
        "data": {
            "reference": outcome.reference,
            "amount": Money::from_major(5000).cents(),
            "status": "success"
        }
    })
    .to_string()
    .into_bytes();
    let headers = WebhookHeaders::new()
        .with(paystack::SIGNATURE_HEADER, paystack::sign(SECRET, &body).unwrap())
        .with("x-payment-provider", "paystack");

    let receipt = h
        .gateway
        .handle_webhook(&RequestContext::new("req-webhook"), &headers, &body)
        .await
        .unwrap();
    assert_eq!(
        receipt,
        WebhookReceipt::Applied {
            transaction_id: outcome.transaction_id,
            status: TransactionStatus::Success,
        }
    );

    let sub = h
        .subscriptions
        .get_subscription(outcome.subscription_id)
        .await
        .unwrap();
    assert!(sub.has_paid);
    assert_eq!(sub.paid_transaction.as_deref(), Some(outcome.reference.as_str()));

    let paid = h.bus.published_events(events::VENDOR_SUBSCRIPTION_PAID).await;
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].correlation_id.as_deref(), Some("req-webhook"));

    // Replays are absorbed.
    let replay = h
        .gateway
        .handle_webhook(&RequestContext::new("req-webhook-2"), &headers, &body)
        .await
        .unwrap();
    assert!(matches!(replay, WebhookReceipt::Duplicate { .. }));
    assert_eq!(
        h.bus.published_events(events::VENDOR_SUBSCRIPTION_PAID).await.len(),
        1
    );
}

#[tokio::test]
async fn unknown_subscription_id_after_timeout_is_recorded() {
    /// Creates the subscription, then answers too late.
    struct LateSubscriptions {
        inner: Arc<Subscriptions>,
    }

    #[async_trait]
    impl SubscriptionLifecycle for LateSubscriptions {
        async fn create_vendor_plan_subscription(
            &self,
            ctx: &RequestContext,
            plan_id: PlanId,
            vendor_id: VendorId,
        ) -> Result<SubscriptionInstance, StepError> {
            let sub = SubscriptionLifecycle::create_vendor_plan_subscription(
                self.inner.as_ref(),
                ctx,
                plan_id,
                vendor_id,
            )
            .await?;
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(sub)
        }

        async fn discard_subscription(
            &self,
            ctx: &RequestContext,
            id: SubscriptionId,
        ) -> Result<bool, StepError> {
            SubscriptionLifecycle::discard_subscription(self.inner.as_ref(), ctx, id).await
        }
    }

    let h = Harness::new().await;
    let subscriptions = Arc::new(LateSubscriptions {
        inner: h.subscriptions.clone(),
    });
    let _ = h
        .saga_with(h.vendors.clone(), subscriptions)
        .register(&RequestContext::new("req-1"), h.registration("ada@shop.example"))
        .await
        .unwrap_err();

    let saga_id = h.log.saga_ids().await[0];
    let events = h.events_of(saga_id).await;
    assert!(events.iter().any(|e| matches!(
        e,
        RegistrationEvent::CompensationStepFailed {
            action: Compensation::DiscardSubscription,
            ..
        }
    )));
    // Left for the audit; everything else is undone.
    assert_eq!(h.subscriptions.store().subscription_count().await, 1);
    assert_eq!(h.vendors.store().live_count().await, 0);

    let audit = OrphanAudit::new(
        h.subscriptions.clone(),
        h.gateway.clone(),
        chrono::Duration::zero(),
    );
    assert_eq!(audit.run(&RequestContext::new("audit")).await.unwrap().len(), 1);
}

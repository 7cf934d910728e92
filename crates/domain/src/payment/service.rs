use std::sync::Arc;

use chrono::Utc;
use common::{Page, Pagination, RequestContext, TransactionId};
use event_bus::{EventBus, EventBusExt, PaymentCompleted, Topic};
use tokio::sync::Mutex;

use super::{
    CANCELLED_AT, ChargeRequest, ChargeUpdate, EntityType, InitiateTransaction, PaymentError, ProviderRegistry,
    Transaction, TransactionFilter, TransactionStatus, TransactionStore, WebhookEvent,
    WebhookHeaders,
};
use crate::validation::{is_valid_email, normalize_email};

/// What a verified webhook did to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookReceipt {
    /// The transaction moved to a new status.
    Applied {
        transaction_id: TransactionId,
        status: TransactionStatus,
    },
    /// Replay, or a status the transaction may not move to.
    Duplicate { transaction_id: TransactionId },
    /// An authentic event this service does not act on.
    Ignored { event: String },
}

/// Provider-agnostic payment gateway over a transaction ledger.
pub struct PaymentGateway<S: TransactionStore> {
    store: S,
    providers: Arc<ProviderRegistry>,
    bus: Arc<dyn EventBus>,
    callback_url: Option<String>,
    allow_sniffing: bool,
    // Webhook application is read-modify-write over one transaction.
    apply_lock: Mutex<()>,
}

impl<S: TransactionStore> PaymentGateway<S> {
    pub fn new(store: S, providers: Arc<ProviderRegistry>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            store,
            providers,
            bus,
            callback_url: None,
            allow_sniffing: true,
            apply_lock: Mutex::new(()),
        }
    }

    /// URL the payer is sent back to after paying.
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    /// Whether a webhook that names no provider, by `X-Payment-Provider` or
    /// by a provider signature header, may be matched on its body. On by
    /// default.
    pub fn with_provider_sniffing(mut self, allow: bool) -> Self {
        self.allow_sniffing = allow;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Opens a payment with `provider` (or the default one) and records it
    /// as `Pending`.
    ///
    /// An entity has at most one pending transaction; asking again returns
    /// the existing one without calling the provider.
    #[tracing::instrument(
        skip(self, ctx, input),
        fields(correlation_id = %ctx.correlation_id(), entity_id = %input.entity_id, entity_type = %input.entity_type)
    )]
    pub async fn initiate_transaction(
        &self,
        ctx: &RequestContext,
        provider: Option<&str>,
        input: InitiateTransaction,
    ) -> Result<Transaction, PaymentError> {
        if !input.amount.is_positive() {
            return Err(PaymentError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        if input.entity_id.trim().is_empty() {
            return Err(PaymentError::Validation("entity id must be provided".into()));
        }
        let email = normalize_email(&input.email);
        if !is_valid_email(&email) {
            return Err(PaymentError::Validation(
                "email must be a valid address".into(),
            ));
        }

        if let Some(existing) = self
            .store
            .find_pending_for_entity(&input.entity_id, input.entity_type)
            .await?
        {
            tracing::info!(reference = %existing.reference, "reusing pending transaction");
            return Ok(existing);
        }

        let provider = match provider {
            Some(name) => self
                .providers
                .get(name)
                .ok_or(PaymentError::UnsupportedProvider)?,
            None => self.providers.default_provider(),
        };

        let id = TransactionId::new();
        let reference = id.as_uuid().simple().to_string();
        let mut metadata = input.metadata;
        metadata.insert("correlationId".into(), ctx.correlation_id().to_string());

        let initiated = provider
            .initiate(&ChargeRequest {
                reference: reference.clone(),
                amount: input.amount,
                email: email.clone(),
                callback_url: self.callback_url.clone(),
                metadata: metadata.clone(),
            })
            .await?;
        metadata.extend(initiated.metadata);

        let now = Utc::now();
        let tx = Transaction {
            id,
            provider: provider.name().to_string(),
            reference,
            entity_id: input.entity_id,
            entity_type: input.entity_type,
            amount: input.amount,
            email,
            status: TransactionStatus::Pending,
            payment_url: initiated.payment_url,
            metadata,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert(tx).await {
            Ok(tx) => {
                metrics::counter!("payment_transactions_initiated_total", "provider" => tx.provider.clone())
                    .increment(1);
                tracing::info!(reference = %tx.reference, provider = %tx.provider, "transaction initiated");
                Ok(tx)
            }
            // Lost a race with a concurrent initiation for the same entity.
            Err(PaymentError::DuplicatePending {
                entity_id,
                entity_type,
            }) => {
                let existing = self
                    .store
                    .find_pending_for_entity(&entity_id, entity_type)
                    .await?;
                existing.ok_or(PaymentError::DuplicatePending {
                    entity_id,
                    entity_type,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Verifies a provider webhook and applies it to the ledger.
    ///
    /// Only a transition into `Success` publishes the entity's paid event.
    /// The event goes out before the status is stored, so a failure at
    /// either point surfaces as an error, the provider redelivers, and the
    /// event is published again.
    #[tracing::instrument(skip(self, ctx, headers, body), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn handle_webhook(
        &self,
        ctx: &RequestContext,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> Result<WebhookReceipt, PaymentError> {
        let provider = self
            .providers
            .resolve(headers, body, self.allow_sniffing)?;
        let event = provider.parse_webhook(headers, body).inspect_err(|e| {
            metrics::counter!("webhooks_rejected_total", "provider" => provider.name()).increment(1);
            tracing::warn!(provider = provider.name(), error = %e, "webhook rejected");
        })?;

        let receipt = match event {
            WebhookEvent::Ignored { event } => {
                tracing::debug!(provider = provider.name(), %event, "webhook ignored");
                WebhookReceipt::Ignored { event }
            }
            WebhookEvent::Charge(update) => self.apply(ctx, provider.name(), update).await?,
        };

        let outcome = match &receipt {
            WebhookReceipt::Applied { .. } => "applied",
            WebhookReceipt::Duplicate { .. } => "duplicate",
            WebhookReceipt::Ignored { .. } => "ignored",
        };
        metrics::counter!("webhooks_processed_total", "provider" => provider.name(), "outcome" => outcome)
            .increment(1);
        Ok(receipt)
    }

    async fn apply(
        &self,
        ctx: &RequestContext,
        provider: &str,
        update: ChargeUpdate,
    ) -> Result<WebhookReceipt, PaymentError> {
        let _guard = self.apply_lock.lock().await;

        let not_found = || PaymentError::TransactionNotFound {
            provider: provider.to_string(),
            reference: update.reference.clone(),
        };
        let mut tx = self
            .store
            .find_by_reference(&update.reference)
            .await?
            .filter(|tx| tx.provider == provider)
            .ok_or_else(not_found)?;

        if !tx.status.can_transition_to(update.status) {
            tracing::info!(reference = %tx.reference, status = %tx.status, reported = %update.status, "webhook replay");
            return Ok(WebhookReceipt::Duplicate {
                transaction_id: tx.id,
            });
        }

        let now = Utc::now();
        let mut status = update.status;
        if status == TransactionStatus::Success {
            if let Some(actual) = update.amount
                && actual != tx.amount
            {
                return Err(PaymentError::AmountMismatch {
                    reference: tx.reference,
                    expected: tx.amount,
                    actual,
                });
            }
            if tx.was_cancelled() {
                // The paid-for entity was already rolled back.
                status = TransactionStatus::RefundDue;
                metrics::counter!("payments_refund_due_total", "provider" => provider.to_string())
                    .increment(1);
                tracing::error!(
                    reference = %tx.reference,
                    entity_id = %tx.entity_id,
                    entity_type = %tx.entity_type,
                    amount = %tx.amount,
                    "payment received for a cancelled transaction; refund required"
                );
            } else {
                self.publish_paid(ctx, &tx).await?;
            }
            tx.paid_at = Some(now);
        }

        tx.status = status;
        tx.updated_at = now;
        let transaction_id = tx.id;
        self.store.update(tx).await?;

        tracing::info!(%transaction_id, %status, "transaction updated");
        Ok(WebhookReceipt::Applied {
            transaction_id,
            status,
        })
    }

    async fn publish_paid(&self, ctx: &RequestContext, tx: &Transaction) -> Result<(), PaymentError> {
        self.bus
            .publish_event(
                ctx,
                Topic::Payment,
                tx.entity_type.paid_event(),
                &PaymentCompleted {
                    entity_id: tx.entity_id.clone(),
                    entity_type: tx.entity_type.as_str().to_string(),
                    amount: tx.amount,
                    reference: tx.reference.clone(),
                    metadata: tx.metadata.clone(),
                },
            )
            .await
            .map_err(|e| PaymentError::Publish(e.to_string()))
    }

    /// Abandons a pending transaction. Returns false when there was nothing
    /// pending under `reference`.
    #[tracing::instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn cancel_transaction(
        &self,
        ctx: &RequestContext,
        reference: &str,
    ) -> Result<bool, PaymentError> {
        let _guard = self.apply_lock.lock().await;
        match self.store.find_by_reference(reference).await? {
            Some(tx) => self.abandon(tx).await,
            None => Ok(false),
        }
    }

    /// Abandons the entity's pending transaction, if any. Used when the
    /// reference was never learned, e.g. the initiation timed out.
    #[tracing::instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn cancel_pending_for_entity(
        &self,
        ctx: &RequestContext,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<bool, PaymentError> {
        let _guard = self.apply_lock.lock().await;
        match self
            .store
            .find_pending_for_entity(entity_id, entity_type)
            .await?
        {
            Some(tx) => self.abandon(tx).await,
            None => Ok(false),
        }
    }

    async fn abandon(&self, mut tx: Transaction) -> Result<bool, PaymentError> {
        if tx.status != TransactionStatus::Pending {
            return Ok(false);
        }
        let now = Utc::now();
        tx.status = TransactionStatus::Abandoned;
        tx.metadata.insert(CANCELLED_AT.to_string(), now.to_rfc3339());
        tx.updated_at = now;
        let reference = tx.reference.clone();
        self.store.update(tx).await?;
        tracing::info!(%reference, "transaction abandoned");
        Ok(true)
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, PaymentError> {
        self.store.get(id).await?.ok_or(PaymentError::NotFound(id))
    }

    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> Result<Page<Transaction>, PaymentError> {
        Ok(pagination.apply(self.store.list(filter).await?))
    }

    pub async fn find_by_entity(
        &self,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Vec<Transaction>, PaymentError> {
        self.store.find_by_entity(entity_id, entity_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{Initiated, InMemoryTransactionStore, PaymentProvider};
    use async_trait::async_trait;
    use common::Money;
    use event_bus::{InMemoryEventBus, events};
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Trusts any webhook carrying `x-fake-secret: ok`; body is
    /// `{reference, status, amount?}`.
    #[derive(Default)]
    struct FakeProvider {
        initiations: AtomicUsize,
    }

    #[derive(Deserialize)]
    struct FakeBody {
        reference: String,
        status: TransactionStatus,
        amount: Option<i64>,
    }

    #[async_trait]
    impl PaymentProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn initiate(&self, charge: &ChargeRequest) -> Result<Initiated, PaymentError> {
            self.initiations.fetch_add(1, Ordering::SeqCst);
            Ok(Initiated {
                payment_url: format!("https://pay.fake/{}", charge.reference),
                metadata: HashMap::new(),
            })
        }

        fn parse_webhook(
            &self,
            headers: &WebhookHeaders,
            body: &[u8],
        ) -> Result<WebhookEvent, PaymentError> {
            if headers.get("x-fake-secret") != Some("ok") {
                return Err(PaymentError::InvalidSignature { provider: "fake" });
            }
            let body: FakeBody =
                serde_json::from_slice(body).map_err(|e| PaymentError::MalformedWebhook {
                    provider: "fake",
                    reason: e.to_string(),
                })?;
            Ok(WebhookEvent::Charge(ChargeUpdate {
                reference: body.reference,
                status: body.status,
                amount: body.amount.map(Money::from_cents),
            }))
        }

        fn recognizes(&self, body: &serde_json::Value) -> bool {
            body.get("reference").is_some()
        }
    }

    struct Fixture {
        gateway: PaymentGateway<InMemoryTransactionStore>,
        bus: InMemoryEventBus,
        provider: Arc<FakeProvider>,
    }

    fn fixture() -> Fixture {
        let bus = InMemoryEventBus::new();
        let provider = Arc::new(FakeProvider::default());
        let registry = ProviderRegistry::builder()
            .register(provider.clone())
            .build()
            .unwrap();
        Fixture {
            gateway: PaymentGateway::new(
                InMemoryTransactionStore::new(),
                Arc::new(registry),
                Arc::new(bus.clone()),
            ),
            bus,
            provider,
        }
    }

    fn subscription_payment(entity_id: &str) -> InitiateTransaction {
        InitiateTransaction {
            amount: Money::from_major(5000),
            entity_id: entity_id.into(),
            entity_type: EntityType::VendorSubscription,
            email: "Vendor@Example.com".into(),
            metadata: HashMap::from([("planId".to_string(), "p-1".to_string())]),
        }
    }

    fn webhook(reference: &str, status: &str) -> (WebhookHeaders, Vec<u8>) {
        let headers = WebhookHeaders::new()
            .with("x-fake-secret", "ok")
            .with("x-payment-provider", "fake");
        let body = serde_json::json!({"reference": reference, "status": status}).to_string();
        (headers, body.into_bytes())
    }

    fn ctx() -> RequestContext {
        RequestContext::new("req-pay")
    }

    #[tokio::test]
    async fn test_initiate_records_pending() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.provider, "fake");
        assert_eq!(tx.email, "vendor@example.com");
        assert!(tx.payment_url.ends_with(&tx.reference));
        assert_eq!(tx.metadata.get("correlationId").map(String::as_str), Some("req-pay"));
    }

    #[tokio::test]
    async fn test_initiate_is_idempotent_per_entity() {
        let f = fixture();
        let first = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        let second = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(f.provider.initiations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initiate_validation() {
        let f = fixture();
        let mut input = subscription_payment("sub-1");
        input.amount = Money::zero();
        assert!(matches!(
            f.gateway.initiate_transaction(&ctx(), None, input).await,
            Err(PaymentError::Validation(_))
        ));
        assert!(matches!(
            f.gateway
                .initiate_transaction(&ctx(), Some("stripe"), subscription_payment("sub-1"))
                .await,
            Err(PaymentError::UnsupportedProvider)
        ));
    }

    #[tokio::test]
    async fn test_success_publishes_once() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        let (headers, body) = webhook(&tx.reference, "success");

        let first = f.gateway.handle_webhook(&ctx(), &headers, &body).await.unwrap();
        let replay = f.gateway.handle_webhook(&ctx(), &headers, &body).await.unwrap();

        assert!(matches!(first, WebhookReceipt::Applied { status: TransactionStatus::Success, .. }));
        assert!(matches!(replay, WebhookReceipt::Duplicate { .. }));

        let paid = f.bus.published_events(events::VENDOR_SUBSCRIPTION_PAID_FOR).await;
        assert_eq!(paid.len(), 1);
        let payload: PaymentCompleted = paid[0].decode().unwrap();
        assert_eq!(payload.entity_id, "sub-1");
        assert_eq!(payload.entity_type, "vendor-subscription");
        assert_eq!(payload.reference, tx.reference);
        assert_eq!(payload.metadata.get("planId").map(String::as_str), Some("p-1"));

        let stored = f.gateway.get_transaction(tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Success);
        assert!(stored.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_never_overwrites_success() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        let (headers, success) = webhook(&tx.reference, "success");
        let (_, failed) = webhook(&tx.reference, "failed");

        f.gateway.handle_webhook(&ctx(), &headers, &success).await.unwrap();
        let receipt = f.gateway.handle_webhook(&ctx(), &headers, &failed).await.unwrap();

        assert!(matches!(receipt, WebhookReceipt::Duplicate { .. }));
        let stored = f.gateway.get_transaction(tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_failed_then_success() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        let (headers, failed) = webhook(&tx.reference, "failed");
        let (_, success) = webhook(&tx.reference, "success");

        f.gateway.handle_webhook(&ctx(), &headers, &failed).await.unwrap();
        assert!(f.bus.published_events(events::VENDOR_SUBSCRIPTION_PAID_FOR).await.is_empty());

        f.gateway.handle_webhook(&ctx(), &headers, &success).await.unwrap();
        assert_eq!(
            f.bus.published_events(events::VENDOR_SUBSCRIPTION_PAID_FOR).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_reference_is_an_error() {
        let f = fixture();
        let (headers, body) = webhook("nope", "success");
        assert!(matches!(
            f.gateway.handle_webhook(&ctx(), &headers, &body).await,
            Err(PaymentError::TransactionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_forged_webhook_changes_nothing() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        let (_, body) = webhook(&tx.reference, "success");
        let headers = WebhookHeaders::new().with("x-payment-provider", "fake");

        assert!(f.gateway.handle_webhook(&ctx(), &headers, &body).await.is_err());
        assert_eq!(
            f.gateway.get_transaction(tx.id).await.unwrap().status,
            TransactionStatus::Pending
        );
        assert!(f.bus.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_amount_mismatch_rejected() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        let headers = WebhookHeaders::new()
            .with("x-fake-secret", "ok")
            .with("x-payment-provider", "fake");
        let body = serde_json::json!({"reference": tx.reference, "status": "success", "amount": 1})
            .to_string();

        assert!(matches!(
            f.gateway.handle_webhook(&ctx(), &headers, body.as_bytes()).await,
            Err(PaymentError::AmountMismatch { .. })
        ));
        assert_eq!(
            f.gateway.get_transaction(tx.id).await.unwrap().status,
            TransactionStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_pending_for_redelivery() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        let (headers, body) = webhook(&tx.reference, "success");

        f.bus.set_fail_on_publish(true);
        assert!(matches!(
            f.gateway.handle_webhook(&ctx(), &headers, &body).await,
            Err(PaymentError::Publish(_))
        ));
        assert_eq!(
            f.gateway.get_transaction(tx.id).await.unwrap().status,
            TransactionStatus::Pending
        );

        f.bus.set_fail_on_publish(false);
        f.gateway.handle_webhook(&ctx(), &headers, &body).await.unwrap();
        assert_eq!(
            f.gateway.get_transaction(tx.id).await.unwrap().status,
            TransactionStatus::Success
        );
    }

    #[tokio::test]
    async fn test_sniffing_can_be_disabled() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        let headers = WebhookHeaders::new().with("x-fake-secret", "ok");
        let (_, body) = webhook(&tx.reference, "success");

        let strict = f.gateway.with_provider_sniffing(false);
        assert!(matches!(
            strict.handle_webhook(&ctx(), &headers, &body).await,
            Err(PaymentError::UnsupportedProvider)
        ));

        let sniffing = strict.with_provider_sniffing(true);
        assert!(sniffing.handle_webhook(&ctx(), &headers, &body).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();

        assert!(f.gateway.cancel_transaction(&ctx(), &tx.reference).await.unwrap());
        assert!(!f.gateway.cancel_transaction(&ctx(), &tx.reference).await.unwrap());
        assert!(!f.gateway.cancel_transaction(&ctx(), "missing").await.unwrap());
        assert_eq!(
            f.gateway.get_transaction(tx.id).await.unwrap().status,
            TransactionStatus::Abandoned
        );

        // A new attempt may now open a fresh transaction.
        let retry = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        assert_ne!(retry.id, tx.id);
        assert!(
            f.gateway
                .cancel_pending_for_entity(&ctx(), "sub-1", EntityType::VendorSubscription)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_success_after_cancel_is_flagged_for_refund() {
        let f = fixture();
        let tx = f
            .gateway
            .initiate_transaction(&ctx(), None, subscription_payment("sub-1"))
            .await
            .unwrap();
        assert!(f.gateway.cancel_transaction(&ctx(), &tx.reference).await.unwrap());
        assert!(f.gateway.get_transaction(tx.id).await.unwrap().was_cancelled());

        let (headers, body) = webhook(&tx.reference, "success");
        let receipt = f.gateway.handle_webhook(&ctx(), &headers, &body).await.unwrap();
        assert!(matches!(
            receipt,
            WebhookReceipt::Applied { status: TransactionStatus::RefundDue, .. }
        ));
        assert!(f.bus.published_events(events::VENDOR_SUBSCRIPTION_PAID_FOR).await.is_empty());

        let stored = f.gateway.get_transaction(tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::RefundDue);
        assert!(stored.paid_at.is_some());

        let replay = f.gateway.handle_webhook(&ctx(), &headers, &body).await.unwrap();
        assert!(matches!(replay, WebhookReceipt::Duplicate { .. }));
        assert!(f.bus.published_events(events::VENDOR_SUBSCRIPTION_PAID_FOR).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_find() {
        let f = fixture();
        for i in 0..3 {
            f.gateway
                .initiate_transaction(&ctx(), None, subscription_payment(&format!("sub-{i}")))
                .await
                .unwrap();
        }

        let page = f
            .gateway
            .list_transactions(
                &TransactionFilter {
                    status: Some(TransactionStatus::Pending),
                    ..Default::default()
                },
                Pagination::new(2, 0),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);

        let found = f
            .gateway
            .find_by_entity("sub-1", EntityType::VendorSubscription)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}

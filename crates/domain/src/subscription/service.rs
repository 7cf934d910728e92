use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{Page, Pagination, PlanId, RequestContext, SubscriptionId, UserId, VendorId};
use event_bus::{EventBus, EventBusExt, Topic, VendorSubscriptionCreated, events};

use super::{
    Interaction, InteractionOutcome, NewPlan, PlanFilter, SubscriptionError, SubscriptionInstance,
    SubscriptionStatus, SubscriptionStore, VendorPlan,
};
use crate::validation::has_min_chars;

/// Outcome of marking a subscription paid.
#[derive(Debug, Clone)]
pub struct PaidOutcome {
    pub subscription: SubscriptionInstance,
    /// False when the subscription was already paid.
    pub changed: bool,
}

/// Plans, subscription instances and the admission check built on them.
pub struct SubscriptionService<S: SubscriptionStore> {
    store: S,
    bus: Arc<dyn EventBus>,
}

impl<S: SubscriptionStore> SubscriptionService<S> {
    pub fn new(store: S, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_vendor_plan(&self, input: NewPlan) -> Result<VendorPlan, SubscriptionError> {
        if !has_min_chars(&input.name, 3) {
            return Err(SubscriptionError::Validation(
                "plan name must be at least 3 characters".into(),
            ));
        }
        if !has_min_chars(&input.content, 1) {
            return Err(SubscriptionError::Validation(
                "plan content must be provided".into(),
            ));
        }
        if !input.price.is_positive() {
            return Err(SubscriptionError::Validation(
                "plan price must be greater than zero".into(),
            ));
        }
        if input.duration_secs <= 0 {
            return Err(SubscriptionError::Validation(
                "plan duration must be greater than zero".into(),
            ));
        }
        if input.user_interactions_allowed == 0 {
            return Err(SubscriptionError::Validation(
                "plan must allow at least one user interaction".into(),
            ));
        }

        self.store
            .insert_plan(VendorPlan {
                id: PlanId::new(),
                name: input.name.trim().to_string(),
                content: input.content,
                price: input.price,
                user_interactions_allowed: input.user_interactions_allowed,
                duration_secs: input.duration_secs,
                is_active: true,
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn get_plan(&self, plan_id: PlanId) -> Result<VendorPlan, SubscriptionError> {
        self.store
            .get_plan(plan_id)
            .await?
            .ok_or(SubscriptionError::PlanNotFound(plan_id))
    }

    pub async fn list_plans(
        &self,
        filter: &PlanFilter,
        pagination: Pagination,
    ) -> Result<Page<VendorPlan>, SubscriptionError> {
        Ok(pagination.apply(self.store.list_plans(filter).await?))
    }

    pub async fn set_plans_active(
        &self,
        plan_ids: &[PlanId],
        is_active: bool,
    ) -> Result<usize, SubscriptionError> {
        if plan_ids.is_empty() {
            return Err(SubscriptionError::Validation(
                "at least one plan id is required".into(),
            ));
        }
        self.store.set_plans_active(plan_ids, is_active).await
    }

    /// Opens an unpaid subscription for a vendor, snapshotting the plan.
    #[tracing::instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn create_vendor_plan_subscription(
        &self,
        ctx: &RequestContext,
        plan_id: PlanId,
        vendor_id: VendorId,
    ) -> Result<SubscriptionInstance, SubscriptionError> {
        let plan = self.get_plan(plan_id).await?;
        if !plan.is_active {
            return Err(SubscriptionError::PlanInactive(plan_id));
        }

        let began_at = Utc::now();
        let subscription = self
            .store
            .insert_subscription(SubscriptionInstance {
                id: SubscriptionId::new(),
                plan_id,
                vendor_id,
                amount: plan.price,
                interactions_allowed: plan.user_interactions_allowed,
                duration_secs: plan.duration_secs,
                has_paid: false,
                began_at,
                expires_at: began_at + plan.duration(),
                paid_at: None,
                paid_transaction: None,
                limit_exceeded_at: None,
            })
            .await?;

        metrics::counter!("subscriptions_created_total").increment(1);
        tracing::info!(subscription_id = %subscription.id, "subscription created");

        // The instance is already stored; a lost announcement must not undo it.
        if let Err(e) = self
            .bus
            .publish_event(
                ctx,
                Topic::Subscription,
                events::VENDOR_SUBSCRIPTION_CREATED,
                &VendorSubscriptionCreated {
                    vendor_id,
                    subscription_id: subscription.id,
                    amount: subscription.amount,
                },
            )
            .await
        {
            tracing::warn!(error = %e, "failed to publish subscription created");
        }

        Ok(subscription)
    }

    /// Marks a subscription paid. A second call changes nothing.
    pub async fn mark_subscription_paid(
        &self,
        ctx: &RequestContext,
        id: SubscriptionId,
    ) -> Result<PaidOutcome, SubscriptionError> {
        self.mark_paid(ctx, id, None).await
    }

    /// Marks a subscription paid by the provider transaction `reference`.
    pub async fn mark_vendor_subscription_as_paid(
        &self,
        ctx: &RequestContext,
        id: SubscriptionId,
        reference: &str,
    ) -> Result<SubscriptionInstance, SubscriptionError> {
        Ok(self.mark_paid(ctx, id, Some(reference)).await?.subscription)
    }

    #[tracing::instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    async fn mark_paid(
        &self,
        ctx: &RequestContext,
        id: SubscriptionId,
        reference: Option<&str>,
    ) -> Result<PaidOutcome, SubscriptionError> {
        let Some(subscription) = self
            .store
            .mark_paid_if_unpaid(id, reference, Utc::now())
            .await?
        else {
            tracing::debug!("subscription already paid");
            return Ok(PaidOutcome {
                subscription: self.get_subscription(id).await?,
                changed: false,
            });
        };

        metrics::counter!("subscriptions_paid_total").increment(1);
        tracing::info!("subscription paid");
        Ok(PaidOutcome {
            subscription,
            changed: true,
        })
    }

    /// Admission gate: valid iff some subscription is unexpired and never
    /// exceeded its limit. Never mutates state.
    pub async fn verify_vendor_subscription_status(
        &self,
        vendor_id: VendorId,
    ) -> Result<SubscriptionStatus, SubscriptionError> {
        let subs = self.store.subscriptions_for_vendor(vendor_id).await?;
        let now = Utc::now();

        let status = |is_valid: bool, message: &str| SubscriptionStatus {
            is_valid,
            message: message.to_string(),
        };
        Ok(if subs.is_empty() {
            status(false, "vendor has no subscription")
        } else if subs.iter().any(|s| s.is_valid_at(now)) {
            status(true, "subscription is valid")
        } else if subs.iter().all(|s| s.expires_at <= now) {
            status(false, "subscription has expired")
        } else {
            status(false, "subscription interaction limit exceeded")
        })
    }

    pub async fn get_active_subscriptions_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<SubscriptionInstance>, SubscriptionError> {
        let now = Utc::now();
        Ok(self
            .store
            .subscriptions_for_vendor(vendor_id)
            .await?
            .into_iter()
            .filter(|s| s.is_active_at(now))
            .collect())
    }

    pub async fn get_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<SubscriptionInstance, SubscriptionError> {
        self.store
            .get_subscription(id)
            .await?
            .ok_or(SubscriptionError::SubscriptionNotFound(id))
    }

    /// Counts a customer interaction against the vendor's current quota and
    /// stamps `limit_exceeded_at` when the quota is used up.
    #[tracing::instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn record_interaction(
        &self,
        ctx: &RequestContext,
        vendor_id: VendorId,
        user_id: UserId,
        kind: &str,
        dedupe_key: &str,
    ) -> Result<InteractionOutcome, SubscriptionError> {
        let now = Utc::now();
        let Some(current) = self
            .get_active_subscriptions_for_vendor(vendor_id)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(InteractionOutcome::NoActiveSubscription);
        };

        let fresh = self
            .store
            .record_interaction(Interaction {
                vendor_id,
                user_id,
                kind: kind.to_string(),
                dedupe_key: dedupe_key.to_string(),
                occurred_at: now,
            })
            .await?;
        if !fresh {
            return Ok(InteractionOutcome::Duplicate);
        }

        let used = self
            .store
            .count_interactions(vendor_id, current.began_at)
            .await?;
        let allowed = current.interactions_allowed;
        if used >= allowed
            && self
                .store
                .stamp_limit_exceeded_if_unset(current.id, now)
                .await?
        {
            tracing::info!(used, allowed, "interaction limit reached");
            return Ok(InteractionOutcome::LimitReached { used, allowed });
        }
        Ok(InteractionOutcome::Recorded { used, allowed })
    }

    /// Removes an unpaid subscription. Missing subscriptions are a no-op;
    /// a paid one is refused.
    #[tracing::instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn discard_subscription(
        &self,
        ctx: &RequestContext,
        id: SubscriptionId,
    ) -> Result<bool, SubscriptionError> {
        let removed = self.store.delete_unpaid_subscription(id).await?;
        if removed {
            tracing::info!("subscription discarded");
        }
        Ok(removed)
    }

    /// Unpaid subscriptions that began before `cutoff`.
    pub async fn find_unpaid_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionInstance>, SubscriptionError> {
        self.store.unpaid_began_before(cutoff).await
    }

    /// Unpaid subscriptions older than `grace`.
    pub async fn find_unpaid_past_grace(
        &self,
        grace: Duration,
    ) -> Result<Vec<SubscriptionInstance>, SubscriptionError> {
        self.find_unpaid_older_than(Utc::now() - grace).await
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{PlanId, SubscriptionId, VendorId};
use tokio::sync::RwLock;

use super::{Interaction, PlanFilter, SubscriptionError, SubscriptionInstance, VendorPlan};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert_plan(&self, plan: VendorPlan) -> Result<VendorPlan, SubscriptionError>;

    async fn get_plan(&self, plan_id: PlanId) -> Result<Option<VendorPlan>, SubscriptionError>;

    /// Plans matching `filter`, newest first.
    async fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<VendorPlan>, SubscriptionError>;

    /// Sets `is_active` on the given plans. Returns how many were found.
    async fn set_plans_active(
        &self,
        plan_ids: &[PlanId],
        is_active: bool,
    ) -> Result<usize, SubscriptionError>;

    async fn insert_subscription(
        &self,
        subscription: SubscriptionInstance,
    ) -> Result<SubscriptionInstance, SubscriptionError>;

    async fn get_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionInstance>, SubscriptionError>;

    /// Sets `has_paid`, `paid_at` and `paid_transaction` unless the
    /// subscription is already paid. Returns the updated instance, or `None`
    /// when it was paid before this call.
    async fn mark_paid_if_unpaid(
        &self,
        id: SubscriptionId,
        reference: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<SubscriptionInstance>, SubscriptionError>;

    /// Sets `limit_exceeded_at` unless it is already set. Returns false when
    /// it was.
    async fn stamp_limit_exceeded_if_unset(
        &self,
        id: SubscriptionId,
        at: DateTime<Utc>,
    ) -> Result<bool, SubscriptionError>;

    /// Deletes the subscription unless it is paid. Returns false when it
    /// does not exist.
    async fn delete_unpaid_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<bool, SubscriptionError>;

    async fn subscriptions_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<SubscriptionInstance>, SubscriptionError>;

    /// Unpaid subscriptions that began before `cutoff`.
    async fn unpaid_began_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionInstance>, SubscriptionError>;

    /// Stores an interaction unless its dedupe key was seen for the vendor.
    /// Returns false for a duplicate.
    async fn record_interaction(&self, interaction: Interaction)
    -> Result<bool, SubscriptionError>;

    /// Interactions for a vendor at or after `since`.
    async fn count_interactions(
        &self,
        vendor_id: VendorId,
        since: DateTime<Utc>,
    ) -> Result<u32, SubscriptionError>;
}

#[derive(Debug, Default)]
struct InMemorySubscriptionState {
    plans: HashMap<PlanId, VendorPlan>,
    subscriptions: HashMap<SubscriptionId, SubscriptionInstance>,
    interactions: Vec<Interaction>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionStore {
    state: Arc<RwLock<InMemorySubscriptionState>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscription_count(&self) -> usize {
        self.state.read().await.subscriptions.len()
    }

    /// Moves a subscription's expiry. Returns false when it does not exist.
    pub async fn set_expires_at(&self, id: SubscriptionId, expires_at: DateTime<Utc>) -> bool {
        match self.state.write().await.subscriptions.get_mut(&id) {
            Some(subscription) => {
                subscription.expires_at = expires_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn insert_plan(&self, plan: VendorPlan) -> Result<VendorPlan, SubscriptionError> {
        let mut state = self.state.write().await;
        if state
            .plans
            .values()
            .any(|p| p.name.eq_ignore_ascii_case(&plan.name))
        {
            return Err(SubscriptionError::DuplicatePlan(plan.name));
        }
        state.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn get_plan(&self, plan_id: PlanId) -> Result<Option<VendorPlan>, SubscriptionError> {
        Ok(self.state.read().await.plans.get(&plan_id).cloned())
    }

    async fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<VendorPlan>, SubscriptionError> {
        let mut plans: Vec<_> = self
            .state
            .read()
            .await
            .plans
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(plans)
    }

    async fn set_plans_active(
        &self,
        plan_ids: &[PlanId],
        is_active: bool,
    ) -> Result<usize, SubscriptionError> {
        let mut state = self.state.write().await;
        let mut found = 0;
        for id in plan_ids {
            if let Some(plan) = state.plans.get_mut(id) {
                plan.is_active = is_active;
                found += 1;
            }
        }
        Ok(found)
    }

    async fn insert_subscription(
        &self,
        subscription: SubscriptionInstance,
    ) -> Result<SubscriptionInstance, SubscriptionError> {
        self.state
            .write()
            .await
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionInstance>, SubscriptionError> {
        Ok(self.state.read().await.subscriptions.get(&id).cloned())
    }

    async fn mark_paid_if_unpaid(
        &self,
        id: SubscriptionId,
        reference: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<SubscriptionInstance>, SubscriptionError> {
        let mut state = self.state.write().await;
        let subscription = state
            .subscriptions
            .get_mut(&id)
            .ok_or(SubscriptionError::SubscriptionNotFound(id))?;
        if subscription.has_paid {
            return Ok(None);
        }
        subscription.has_paid = true;
        subscription.paid_at = Some(paid_at);
        subscription.paid_transaction = reference.map(str::to_string);
        Ok(Some(subscription.clone()))
    }

    async fn stamp_limit_exceeded_if_unset(
        &self,
        id: SubscriptionId,
        at: DateTime<Utc>,
    ) -> Result<bool, SubscriptionError> {
        let mut state = self.state.write().await;
        let subscription = state
            .subscriptions
            .get_mut(&id)
            .ok_or(SubscriptionError::SubscriptionNotFound(id))?;
        if subscription.limit_exceeded_at.is_some() {
            return Ok(false);
        }
        subscription.limit_exceeded_at = Some(at);
        Ok(true)
    }

    async fn delete_unpaid_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<bool, SubscriptionError> {
        let mut state = self.state.write().await;
        match state.subscriptions.get(&id) {
            None => Ok(false),
            Some(s) if s.has_paid => Err(SubscriptionError::AlreadyPaid(id)),
            Some(_) => Ok(state.subscriptions.remove(&id).is_some()),
        }
    }

    async fn subscriptions_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<SubscriptionInstance>, SubscriptionError> {
        let mut subs: Vec<_> = self
            .state
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| s.vendor_id == vendor_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.began_at.cmp(&a.began_at));
        Ok(subs)
    }

    async fn unpaid_began_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionInstance>, SubscriptionError> {
        Ok(self
            .state
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| !s.has_paid && s.began_at < cutoff)
            .cloned()
            .collect())
    }

    async fn record_interaction(
        &self,
        interaction: Interaction,
    ) -> Result<bool, SubscriptionError> {
        let mut state = self.state.write().await;
        if state
            .interactions
            .iter()
            .any(|i| i.vendor_id == interaction.vendor_id && i.dedupe_key == interaction.dedupe_key)
        {
            return Ok(false);
        }
        state.interactions.push(interaction);
        Ok(true)
    }

    async fn count_interactions(
        &self,
        vendor_id: VendorId,
        since: DateTime<Utc>,
    ) -> Result<u32, SubscriptionError> {
        let count = self
            .state
            .read()
            .await
            .interactions
            .iter()
            .filter(|i| i.vendor_id == vendor_id && i.occurred_at >= since)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

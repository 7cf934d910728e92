use chrono::{DateTime, Duration, Utc};
use common::{Money, PlanId, SubscriptionId, UserId, VendorId};
use serde::{Deserialize, Serialize};

/// A subscription plan in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPlan {
    pub id: PlanId,
    pub name: String,
    pub content: String,
    pub price: Money,
    /// Customer interactions a vendor may receive per subscription period.
    pub user_interactions_allowed: u32,
    pub duration_secs: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl VendorPlan {
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }
}

/// Input for `CreateVendorPlan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    pub name: String,
    pub content: String,
    pub price: Money,
    pub user_interactions_allowed: u32,
    pub duration_secs: i64,
}

/// Catalog filter for `ListPlans`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFilter {
    pub is_active: Option<bool>,
    /// Case-insensitive substring of the plan name.
    pub name: Option<String>,
}

impl PlanFilter {
    pub fn matches(&self, plan: &VendorPlan) -> bool {
        self.is_active.is_none_or(|active| plan.is_active == active)
            && self.name.as_ref().is_none_or(|needle| {
                plan.name
                    .to_ascii_lowercase()
                    .contains(&needle.to_ascii_lowercase())
            })
    }
}

/// A vendor's subscription to a plan, with the plan's terms snapshotted.
///
/// Only `has_paid`, `paid_at`, `paid_transaction` and `limit_exceeded_at`
/// change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInstance {
    pub id: SubscriptionId,
    pub plan_id: PlanId,
    pub vendor_id: VendorId,
    pub amount: Money,
    pub interactions_allowed: u32,
    pub duration_secs: i64,
    pub has_paid: bool,
    pub began_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_transaction: Option<String>,
    pub limit_exceeded_at: Option<DateTime<Utc>>,
}

impl SubscriptionInstance {
    /// Admission check: unexpired and never over its interaction limit.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now && self.limit_exceeded_at.is_none()
    }

    /// Unexpired and not yet past a recorded limit breach.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now && self.limit_exceeded_at.is_none_or(|at| at > now)
    }
}

/// Result of `VerifyVendorSubscriptionStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub is_valid: bool,
    pub message: String,
}

/// A customer interaction counted against a vendor's quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub vendor_id: VendorId,
    pub user_id: UserId,
    pub kind: String,
    /// Business key that makes redelivered interactions count once.
    pub dedupe_key: String,
    pub occurred_at: DateTime<Utc>,
}

/// Outcome of `RecordInteraction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    Recorded { used: u32, allowed: u32 },
    /// This interaction reached the quota; the subscription is now stamped.
    LimitReached { used: u32, allowed: u32 },
    Duplicate,
    /// The vendor has no active subscription to count against.
    NoActiveSubscription,
}

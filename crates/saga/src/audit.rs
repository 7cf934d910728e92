//! Detection of subscriptions that no registration will ever pay for.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{RequestContext, SubscriptionId, VendorId};
use domain::payment::EntityType;
use serde::Serialize;

use crate::clients::{PaymentInitiation, SubscriptionLifecycle};
use crate::error::StepError;

/// An unpaid subscription with no transaction behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Orphan {
    pub subscription_id: SubscriptionId,
    pub vendor_id: VendorId,
    pub began_at: DateTime<Utc>,
}

/// Lists subscriptions left behind by failed or interrupted compensation:
/// unpaid, older than `grace`, and never referenced by a transaction.
pub struct OrphanAudit {
    subscriptions: Arc<dyn SubscriptionLifecycle>,
    payments: Arc<dyn PaymentInitiation>,
    grace: chrono::Duration,
}

impl OrphanAudit {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionLifecycle>,
        payments: Arc<dyn PaymentInitiation>,
        grace: chrono::Duration,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            grace,
        }
    }

    #[tracing::instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn run(&self, ctx: &RequestContext) -> Result<Vec<Orphan>, StepError> {
        let cutoff = Utc::now() - self.grace;
        let unpaid = self.subscriptions.find_unpaid_older_than(ctx, cutoff).await?;

        let mut orphans = Vec::new();
        for subscription in unpaid {
            let transactions = self
                .payments
                .find_by_entity(
                    ctx,
                    &subscription.id.to_string(),
                    EntityType::VendorSubscription,
                )
                .await?;
            if transactions.is_empty() {
                orphans.push(Orphan {
                    subscription_id: subscription.id,
                    vendor_id: subscription.vendor_id,
                    began_at: subscription.began_at,
                });
            }
        }

        metrics::gauge!("orphan_subscriptions").set(orphans.len() as f64);
        if !orphans.is_empty() {
            tracing::warn!(count = orphans.len(), "orphaned subscriptions found");
        }
        Ok(orphans)
    }
}

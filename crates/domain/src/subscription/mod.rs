//! Subscription lifecycle: plan catalog, subscription instances, the
//! admission check and interaction quotas.

mod handlers;
mod model;
mod service;
mod store;

pub use handlers::{ORDERED_ITEM, OrderPlacedHandler, PaymentCompletedHandler};
pub use model::{
    Interaction, InteractionOutcome, NewPlan, PlanFilter, SubscriptionInstance,
    SubscriptionStatus, VendorPlan,
};
pub use service::{PaidOutcome, SubscriptionService};
pub use store::{InMemorySubscriptionStore, SubscriptionStore};

use common::{PlanId, SubscriptionId};
use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    Validation(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(PlanId),

    #[error("Plan {0} is not active")]
    PlanInactive(PlanId),

    #[error("A plan named '{0}' already exists")]
    DuplicatePlan(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Subscription {0} is already paid")]
    AlreadyPaid(SubscriptionId),

    #[error("Subscription store error: {0}")]
    Store(String),
}

impl SubscriptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubscriptionError::Validation(_) | SubscriptionError::PlanInactive(_) => {
                ErrorKind::Validation
            }
            SubscriptionError::PlanNotFound(_) | SubscriptionError::SubscriptionNotFound(_) => {
                ErrorKind::NotFound
            }
            SubscriptionError::DuplicatePlan(_) | SubscriptionError::AlreadyPaid(_) => {
                ErrorKind::Conflict
            }
            SubscriptionError::Store(_) => ErrorKind::Internal,
        }
    }
}

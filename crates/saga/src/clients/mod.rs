//! Clients for the services a registration talks to.
//!
//! Each trait is the capability the saga needs from one service. Forward
//! operations are required; undo and audit operations default to
//! [`StepError::Unimplemented`] so a client can be wired before its service
//! supports them, and the gap shows up in the saga log instead of a panic.

mod in_process;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{PlanId, RequestContext, SubscriptionId, UserId, VendorId};
use domain::identity::{NewUser, PendingUser, Role, UserTx};
use domain::payment::{EntityType, InitiateTransaction, Transaction};
use domain::subscription::SubscriptionInstance;
use domain::vendor::NewVendor;

use crate::error::StepError;

/// Local account store with explicit transactions.
#[async_trait]
pub trait UserAccounts: Send + Sync {
    async fn begin(
        &self,
        ctx: &RequestContext,
        user: NewUser,
        role: Role,
    ) -> Result<PendingUser, StepError>;

    async fn ensure_role(
        &self,
        ctx: &RequestContext,
        tx: UserTx,
        user_id: UserId,
        role: Role,
    ) -> Result<(), StepError>;

    async fn commit(&self, ctx: &RequestContext, tx: UserTx) -> Result<(), StepError>;

    async fn rollback(&self, ctx: &RequestContext, tx: UserTx) -> Result<(), StepError>;
}

#[async_trait]
pub trait VendorProvisioning: Send + Sync {
    async fn create_vendor(
        &self,
        ctx: &RequestContext,
        input: NewVendor,
    ) -> Result<VendorId, StepError>;

    /// Withdraws whatever pending vendor the user owns.
    async fn withdraw_vendor_for_user(
        &self,
        _ctx: &RequestContext,
        _user_id: UserId,
    ) -> Result<Option<VendorId>, StepError> {
        Err(StepError::unimplemented("WithdrawVendor"))
    }
}

#[async_trait]
pub trait SubscriptionLifecycle: Send + Sync {
    async fn create_vendor_plan_subscription(
        &self,
        ctx: &RequestContext,
        plan_id: PlanId,
        vendor_id: VendorId,
    ) -> Result<SubscriptionInstance, StepError>;

    async fn discard_subscription(
        &self,
        _ctx: &RequestContext,
        _id: SubscriptionId,
    ) -> Result<bool, StepError> {
        Err(StepError::unimplemented("DiscardSubscription"))
    }

    async fn find_unpaid_older_than(
        &self,
        _ctx: &RequestContext,
        _cutoff: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionInstance>, StepError> {
        Err(StepError::unimplemented("FindUnpaidSubscriptions"))
    }
}

#[async_trait]
pub trait PaymentInitiation: Send + Sync {
    async fn initiate_transaction(
        &self,
        ctx: &RequestContext,
        provider: Option<&str>,
        input: InitiateTransaction,
    ) -> Result<Transaction, StepError>;

    async fn cancel_transaction(
        &self,
        _ctx: &RequestContext,
        _reference: &str,
    ) -> Result<bool, StepError> {
        Err(StepError::unimplemented("CancelTransaction"))
    }

    async fn cancel_pending_for_entity(
        &self,
        _ctx: &RequestContext,
        _entity_id: &str,
        _entity_type: EntityType,
    ) -> Result<bool, StepError> {
        Err(StepError::unimplemented("CancelPendingTransaction"))
    }

    async fn find_by_entity(
        &self,
        _ctx: &RequestContext,
        _entity_id: &str,
        _entity_type: EntityType,
    ) -> Result<Vec<Transaction>, StepError> {
        Err(StepError::unimplemented("FindTransactions"))
    }
}

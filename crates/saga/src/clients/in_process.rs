//! Adapters that call the domain services in the same process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{PlanId, RequestContext, SubscriptionId, UserId, VendorId};
use domain::identity::{IdentityService, NewUser, PendingUser, Role, UserStore, UserTx};
use domain::payment::{EntityType, InitiateTransaction, PaymentGateway, Transaction, TransactionStore};
use domain::subscription::{SubscriptionInstance, SubscriptionService, SubscriptionStore};
use domain::vendor::{NewVendor, VendorDirectory, VendorStore};

use super::{PaymentInitiation, SubscriptionLifecycle, UserAccounts, VendorProvisioning};
use crate::error::{StepError, rejected};

#[async_trait]
impl<S: UserStore + 'static> UserAccounts for IdentityService<S> {
    async fn begin(
        &self,
        ctx: &RequestContext,
        user: NewUser,
        role: Role,
    ) -> Result<PendingUser, StepError> {
        self.begin_registration(ctx, user, role)
            .await
            .map_err(rejected)
    }

    async fn ensure_role(
        &self,
        _ctx: &RequestContext,
        tx: UserTx,
        user_id: UserId,
        role: Role,
    ) -> Result<(), StepError> {
        IdentityService::ensure_role(self, tx, user_id, role)
            .await
            .map_err(rejected)
    }

    async fn commit(&self, _ctx: &RequestContext, tx: UserTx) -> Result<(), StepError> {
        IdentityService::commit(self, tx).await.map_err(rejected)
    }

    async fn rollback(&self, _ctx: &RequestContext, tx: UserTx) -> Result<(), StepError> {
        IdentityService::rollback(self, tx).await.map_err(rejected)
    }
}

#[async_trait]
impl<S: VendorStore + 'static> VendorProvisioning for VendorDirectory<S> {
    async fn create_vendor(
        &self,
        ctx: &RequestContext,
        input: NewVendor,
    ) -> Result<VendorId, StepError> {
        VendorDirectory::create_vendor(self, ctx, input)
            .await
            .map(|record| record.id)
            .map_err(rejected)
    }

    async fn withdraw_vendor_for_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<Option<VendorId>, StepError> {
        VendorDirectory::withdraw_vendor_for_user(self, ctx, user_id)
            .await
            .map_err(rejected)
    }
}

#[async_trait]
impl<S: SubscriptionStore + 'static> SubscriptionLifecycle for SubscriptionService<S> {
    async fn create_vendor_plan_subscription(
        &self,
        ctx: &RequestContext,
        plan_id: PlanId,
        vendor_id: VendorId,
    ) -> Result<SubscriptionInstance, StepError> {
        SubscriptionService::create_vendor_plan_subscription(self, ctx, plan_id, vendor_id)
            .await
            .map_err(rejected)
    }

    async fn discard_subscription(
        &self,
        ctx: &RequestContext,
        id: SubscriptionId,
    ) -> Result<bool, StepError> {
        SubscriptionService::discard_subscription(self, ctx, id)
            .await
            .map_err(rejected)
    }

    async fn find_unpaid_older_than(
        &self,
        _ctx: &RequestContext,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionInstance>, StepError> {
        SubscriptionService::find_unpaid_older_than(self, cutoff)
            .await
            .map_err(rejected)
    }
}

#[async_trait]
impl<S: TransactionStore + 'static> PaymentInitiation for PaymentGateway<S> {
    async fn initiate_transaction(
        &self,
        ctx: &RequestContext,
        provider: Option<&str>,
        input: InitiateTransaction,
    ) -> Result<Transaction, StepError> {
        PaymentGateway::initiate_transaction(self, ctx, provider, input)
            .await
            .map_err(rejected)
    }

    async fn cancel_transaction(
        &self,
        ctx: &RequestContext,
        reference: &str,
    ) -> Result<bool, StepError> {
        PaymentGateway::cancel_transaction(self, ctx, reference)
            .await
            .map_err(rejected)
    }

    async fn cancel_pending_for_entity(
        &self,
        ctx: &RequestContext,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<bool, StepError> {
        PaymentGateway::cancel_pending_for_entity(self, ctx, entity_id, entity_type)
            .await
            .map_err(rejected)
    }

    async fn find_by_entity(
        &self,
        _ctx: &RequestContext,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Vec<Transaction>, StepError> {
        PaymentGateway::find_by_entity(self, entity_id, entity_type)
            .await
            .map_err(rejected)
    }
}

//! Step events recorded in the saga log for vendor registrations.

use common::{PlanId, SubscriptionId, TransactionId, UserId, VendorId};
use serde::{Deserialize, Serialize};

/// Forward steps of a registration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    CreateUser,
    VerifyRole,
    CreateVendor,
    CreateSubscription,
    InitiatePayment,
    CommitUser,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::CreateUser => "CreateUser",
            Step::VerifyRole => "VerifyRole",
            Step::CreateVendor => "CreateVendor",
            Step::CreateSubscription => "CreateSubscription",
            Step::InitiatePayment => "InitiatePayment",
            Step::CommitUser => "CommitUser",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Undo actions, run newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compensation {
    CancelPayment,
    DiscardSubscription,
    WithdrawVendor,
    RollbackUser,
}

impl Compensation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compensation::CancelPayment => "CancelPayment",
            Compensation::DiscardSubscription => "DiscardSubscription",
            Compensation::WithdrawVendor => "WithdrawVendor",
            Compensation::RollbackUser => "RollbackUser",
        }
    }
}

impl std::fmt::Display for Compensation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Facts about one registration saga. Each carries the ids produced so far
/// so the log alone is enough to compensate after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RegistrationEvent {
    SagaStarted {
        email: String,
        plan_id: PlanId,
        provider: Option<String>,
    },
    /// Written before the outbound call, so a crash mid-call is visible.
    StepStarted { step: Step },
    UserCreated { user_id: UserId, user_tx: u64 },
    RoleVerified,
    VendorProvisioned { vendor_id: VendorId },
    SubscriptionCreated { subscription_id: SubscriptionId },
    PaymentInitiated {
        transaction_id: TransactionId,
        reference: String,
        payment_url: String,
    },
    StepFailed {
        step: Step,
        error: String,
        /// The remote side may have applied the step anyway.
        uncertain: bool,
    },
    CompensationStarted,
    CompensationStepCompleted { action: Compensation },
    CompensationStepFailed { action: Compensation, error: String },
    SagaCompleted,
    SagaFailed { reason: String },
}

impl RegistrationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RegistrationEvent::SagaStarted { .. } => "SagaStarted",
            RegistrationEvent::StepStarted { .. } => "StepStarted",
            RegistrationEvent::UserCreated { .. } => "UserCreated",
            RegistrationEvent::RoleVerified => "RoleVerified",
            RegistrationEvent::VendorProvisioned { .. } => "VendorProvisioned",
            RegistrationEvent::SubscriptionCreated { .. } => "SubscriptionCreated",
            RegistrationEvent::PaymentInitiated { .. } => "PaymentInitiated",
            RegistrationEvent::StepFailed { .. } => "StepFailed",
            RegistrationEvent::CompensationStarted => "CompensationStarted",
            RegistrationEvent::CompensationStepCompleted { .. } => "CompensationStepCompleted",
            RegistrationEvent::CompensationStepFailed { .. } => "CompensationStepFailed",
            RegistrationEvent::SagaCompleted => "SagaCompleted",
            RegistrationEvent::SagaFailed { .. } => "SagaFailed",
        }
    }

    /// True for the events that end a saga.
    pub fn closes_saga(&self) -> bool {
        matches!(
            self,
            RegistrationEvent::SagaCompleted | RegistrationEvent::SagaFailed { .. }
        )
    }

    pub fn step_failed(step: Step, error: &crate::StepError) -> Self {
        RegistrationEvent::StepFailed {
            step,
            error: error.to_string(),
            uncertain: error.is_uncertain(),
        }
    }

    pub fn compensated(action: Compensation) -> Self {
        RegistrationEvent::CompensationStepCompleted { action }
    }

    pub fn compensation_failed(action: Compensation, error: impl ToString) -> Self {
        RegistrationEvent::CompensationStepFailed {
            action,
            error: error.to_string(),
        }
    }
}

//! Vendor registration saga.
//!
//! A registration touches four independently owned stores:
//! 1. Stage the user (local transaction) and verify the vendor role
//! 2. Create the vendor record
//! 3. Open an unpaid subscription
//! 4. Initiate the payment and commit the user
//!
//! Progress is recorded in the saga log before each step. If a step fails,
//! the started steps are compensated in reverse order. Sagas interrupted by
//! a crash are compensated later by [`SagaRecovery`], and anything a failed
//! compensation left behind is reported by [`OrphanAudit`].

pub mod audit;
pub mod clients;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod instance;
mod journal;
pub mod recovery;
pub mod state;

pub use audit::{Orphan, OrphanAudit};
pub use clients::{PaymentInitiation, SubscriptionLifecycle, UserAccounts, VendorProvisioning};
pub use coordinator::{
    PAYMENT_MESSAGE, RegistrationOutcome, RegistrationSaga, SAGA_TYPE, SagaSettings,
    VendorInfo, VendorRegistration,
};
pub use error::{SagaError, StepError};
pub use events::{Compensation, RegistrationEvent, Step};
pub use instance::{RegistrationInstance, StepFailure};
pub use recovery::{RecoveryReport, SagaRecovery};
pub use state::RegistrationState;

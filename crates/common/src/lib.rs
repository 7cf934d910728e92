//! Shared types for the vendor onboarding services.

pub mod context;
pub mod ids;
pub mod money;
pub mod pagination;

pub use context::{CORRELATION_ID_HEADER, Caller, RequestContext};
pub use ids::{NotificationId, PlanId, SagaId, SubscriptionId, TransactionId, UserId, VendorId};
pub use money::Money;
pub use pagination::{Page, Pagination};

//! Services behind vendor onboarding.
//!
//! Each service owns its store and talks to the others only through direct
//! calls made by the registration saga or through bus events:
//! - [`identity`]: users, roles, local registration transactions, email
//!   verification
//! - [`vendor`]: the vendor directory
//! - [`subscription`]: vendor plans, subscription instances and quotas
//! - [`payment`]: provider-agnostic payments and webhook reconciliation
//! - [`notification`]: multi-channel fan-out

pub mod error;
pub mod identity;
pub mod notification;
pub mod payment;
pub mod subscription;
pub mod validation;
pub mod vendor;

pub use error::{DomainError, ErrorKind};
pub use identity::{IdentityError, IdentityService, InMemoryUserStore};
pub use notification::{Notification, NotificationDispatcher, NotificationError};
pub use payment::{InMemoryTransactionStore, PaymentError, PaymentGateway, ProviderRegistry};
pub use subscription::{InMemorySubscriptionStore, SubscriptionError, SubscriptionService};
pub use vendor::{InMemoryVendorStore, VendorDirectory, VendorError};

//! Domain error types.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::notification::NotificationError;
use crate::payment::PaymentError;
use crate::subscription::SubscriptionError;
use crate::vendor::VendorError;

/// Coarse classification used when mapping errors to transport responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something malformed.
    Validation,
    NotFound,
    /// The request collides with existing state.
    Conflict,
    /// A collaborator failed or timed out.
    Downstream,
    Internal,
}

/// Errors from any of the domain services.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Vendor error: {0}")]
    Vendor(#[from] VendorError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Identity(e) => e.kind(),
            DomainError::Vendor(e) => e.kind(),
            DomainError::Subscription(e) => e.kind(),
            DomainError::Payment(e) => e.kind(),
            DomainError::Notification(e) => e.kind(),
        }
    }
}

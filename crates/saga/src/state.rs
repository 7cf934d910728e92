//! Registration saga state machine.

use serde::{Deserialize, Serialize};

/// Where a registration saga stands.
///
/// ```text
/// Init ──► UserCreated ──► VendorProvisioned ──► SubscriptionCreated ──► PaymentInitiated ──► Returned
///   │           │                  │                      │                      │
///   └───────────┴──────────────────┴──────────┬───────────┴──────────────────────┘
///                                             ▼
///                                       Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RegistrationState {
    #[default]
    Init,
    UserCreated,
    VendorProvisioned,
    SubscriptionCreated,
    PaymentInitiated,
    /// The payment URL was handed back (terminal).
    Returned,
    Compensating,
    /// Compensation finished after a failure (terminal).
    Failed,
}

impl RegistrationState {
    /// Forward successor, if any.
    pub fn next(&self) -> Option<RegistrationState> {
        use RegistrationState::*;
        match self {
            Init => Some(UserCreated),
            UserCreated => Some(VendorProvisioned),
            VendorProvisioned => Some(SubscriptionCreated),
            SubscriptionCreated => Some(PaymentInitiated),
            PaymentInitiated => Some(Returned),
            Returned | Compensating | Failed => None,
        }
    }

    pub fn can_compensate(&self) -> bool {
        !self.is_terminal() && *self != RegistrationState::Compensating
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationState::Returned | RegistrationState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationState::Init => "Init",
            RegistrationState::UserCreated => "UserCreated",
            RegistrationState::VendorProvisioned => "VendorProvisioned",
            RegistrationState::SubscriptionCreated => "SubscriptionCreated",
            RegistrationState::PaymentInitiated => "PaymentInitiated",
            RegistrationState::Returned => "Returned",
            RegistrationState::Compensating => "Compensating",
            RegistrationState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

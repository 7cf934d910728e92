//! User accounts, roles and email verification.

mod handlers;
mod model;
mod password;
mod service;
mod store;

pub use handlers::VendorActivatedHandler;
pub use model::{NewUser, Role, RoleAssignment, User, UserTx, VerificationToken};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use service::{IdentityService, PendingUser};
pub use store::{InMemoryUserStore, UserStore};

use common::UserId;
use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{0}")]
    Validation(String),

    #[error("email has been taken")]
    EmailTaken,

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("User {user_id} does not hold the {role} role")]
    RoleNotAssigned { user_id: UserId, role: Role },

    #[error("Unknown user transaction: {0}")]
    UnknownTransaction(u64),

    #[error("invalid or already used verification token")]
    InvalidToken,

    #[error("verification token has expired")]
    TokenExpired,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("User store error: {0}")]
    Store(String),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Validation(_)
            | IdentityError::InvalidToken
            | IdentityError::TokenExpired => ErrorKind::Validation,
            IdentityError::EmailTaken => ErrorKind::Conflict,
            IdentityError::UserNotFound(_) => ErrorKind::NotFound,
            IdentityError::RoleNotAssigned { .. }
            | IdentityError::UnknownTransaction(_)
            | IdentityError::Hashing(_)
            | IdentityError::Store(_) => ErrorKind::Internal,
        }
    }
}

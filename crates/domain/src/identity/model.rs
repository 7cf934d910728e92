use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

/// Account roles. The numeric ids are the ones clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Vendor,
    Customer,
}

impl Role {
    pub fn id(&self) -> u8 {
        match self {
            Role::Admin => 1,
            Role::Vendor => 2,
            Role::Customer => 3,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Vendor),
            3 => Some(Role::Customer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Vendor => "vendor",
            Role::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A role held by a user. Vendor roles start inactive until payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Handle for a local identity-store transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserTx(pub(crate) u64);

impl UserTx {
    /// Rebuilds a handle from a recorded id. Committing or rolling back a
    /// handle the store no longer knows is safe.
    pub fn from_id(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Single-use email verification token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationToken {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ids_round_trip() {
        for role in [Role::Admin, Role::Vendor, Role::Customer] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(9), None);
        assert_eq!(Role::Vendor.to_string(), "vendor");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: UserId::new(),
            name: "Vendor X".into(),
            email: "v@x.com".into(),
            password_hash: "secret-hash".into(),
            is_verified: false,
            verified_at: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}

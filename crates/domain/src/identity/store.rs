use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::UserId;
use tokio::sync::RwLock;

use super::{IdentityError, Role, RoleAssignment, User, UserTx, VerificationToken};

/// Persistence for users, their roles and verification tokens.
///
/// User creation and role assignment happen inside a local transaction that
/// is invisible to other readers until committed.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn begin(&self) -> Result<UserTx, IdentityError>;

    /// Stages a user. Fails with `EmailTaken` if the email is already in use.
    async fn create_user(&self, tx: UserTx, user: User) -> Result<User, IdentityError>;

    async fn assign_role(
        &self,
        tx: UserTx,
        user_id: UserId,
        assignment: RoleAssignment,
    ) -> Result<(), IdentityError>;

    /// Roles of a user, including those staged in `tx`.
    async fn roles_of(
        &self,
        tx: Option<UserTx>,
        user_id: UserId,
    ) -> Result<Vec<RoleAssignment>, IdentityError>;

    async fn commit(&self, tx: UserTx) -> Result<(), IdentityError>;

    /// Discards a transaction. Rolling back an unknown or finished
    /// transaction is a no-op.
    async fn rollback(&self, tx: UserTx) -> Result<(), IdentityError>;

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, IdentityError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError>;

    async fn update_user(&self, user: User) -> Result<(), IdentityError>;

    /// Sets a committed role's active flag. Returns whether it changed.
    async fn set_role_active(
        &self,
        user_id: UserId,
        role: Role,
        active: bool,
    ) -> Result<bool, IdentityError>;

    async fn save_token(&self, token: VerificationToken) -> Result<(), IdentityError>;

    /// Removes and returns a token, so each token verifies at most once.
    async fn take_token(&self, token: &str) -> Result<Option<VerificationToken>, IdentityError>;
}

#[derive(Debug, Default)]
struct Staged {
    users: Vec<User>,
    roles: Vec<(UserId, RoleAssignment)>,
}

#[derive(Debug, Default)]
struct InMemoryUserState {
    users: HashMap<UserId, User>,
    roles: HashMap<UserId, Vec<RoleAssignment>>,
    tokens: HashMap<String, VerificationToken>,
    open: HashMap<u64, Staged>,
    next_tx: u64,
}

impl InMemoryUserState {
    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email == email)
            || self
                .open
                .values()
                .any(|s| s.users.iter().any(|u| u.email == email))
    }
}

/// In-memory user store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    state: Arc<RwLock<InMemoryUserState>>,
    drop_role_writes: Arc<AtomicBool>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes role assignments silently disappear, as a misbehaving
    /// database would.
    pub fn set_drop_role_writes(&self, drop: bool) {
        self.drop_role_writes.store(drop, Ordering::SeqCst);
    }

    /// Number of committed users.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Number of transactions neither committed nor rolled back.
    pub async fn open_transactions(&self) -> usize {
        self.state.read().await.open.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn begin(&self) -> Result<UserTx, IdentityError> {
        let mut state = self.state.write().await;
        state.next_tx += 1;
        let id = state.next_tx;
        state.open.insert(id, Staged::default());
        Ok(UserTx(id))
    }

    async fn create_user(&self, tx: UserTx, user: User) -> Result<User, IdentityError> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email) {
            return Err(IdentityError::EmailTaken);
        }
        let staged = state
            .open
            .get_mut(&tx.0)
            .ok_or(IdentityError::UnknownTransaction(tx.0))?;
        staged.users.push(user.clone());
        Ok(user)
    }

    async fn assign_role(
        &self,
        tx: UserTx,
        user_id: UserId,
        assignment: RoleAssignment,
    ) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;
        let staged = state
            .open
            .get_mut(&tx.0)
            .ok_or(IdentityError::UnknownTransaction(tx.0))?;
        if !self.drop_role_writes.load(Ordering::SeqCst) {
            staged.roles.push((user_id, assignment));
        }
        Ok(())
    }

    async fn roles_of(
        &self,
        tx: Option<UserTx>,
        user_id: UserId,
    ) -> Result<Vec<RoleAssignment>, IdentityError> {
        let state = self.state.read().await;
        let mut roles = state.roles.get(&user_id).cloned().unwrap_or_default();
        if let Some(tx) = tx
            && let Some(staged) = state.open.get(&tx.0)
        {
            roles.extend(
                staged
                    .roles
                    .iter()
                    .filter(|(id, _)| *id == user_id)
                    .map(|(_, a)| *a),
            );
        }
        Ok(roles)
    }

    async fn commit(&self, tx: UserTx) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;
        let staged = state
            .open
            .remove(&tx.0)
            .ok_or(IdentityError::UnknownTransaction(tx.0))?;
        for user in staged.users {
            state.users.insert(user.id, user);
        }
        for (user_id, assignment) in staged.roles {
            state.roles.entry(user_id).or_default().push(assignment);
        }
        Ok(())
    }

    async fn rollback(&self, tx: UserTx) -> Result<(), IdentityError> {
        self.state.write().await.open.remove(&tx.0);
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, IdentityError> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user: User) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user;
                Ok(())
            }
            None => Err(IdentityError::UserNotFound(user.id)),
        }
    }

    async fn set_role_active(
        &self,
        user_id: UserId,
        role: Role,
        active: bool,
    ) -> Result<bool, IdentityError> {
        let mut state = self.state.write().await;
        let assignment = state
            .roles
            .get_mut(&user_id)
            .and_then(|roles| roles.iter_mut().find(|a| a.role == role))
            .ok_or(IdentityError::RoleNotAssigned { user_id, role })?;
        let changed = assignment.is_active != active;
        assignment.is_active = active;
        Ok(changed)
    }

    async fn save_token(&self, token: VerificationToken) -> Result<(), IdentityError> {
        self.state
            .write()
            .await
            .tokens
            .insert(token.token.clone(), token);
        Ok(())
    }

    async fn take_token(&self, token: &str) -> Result<Option<VerificationToken>, IdentityError> {
        Ok(self.state.write().await.tokens.remove(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(email: &str) -> User {
        User {
            id: UserId::new(),
            name: "Vendor X".into(),
            email: email.into(),
            password_hash: "h".into(),
            is_verified: false,
            verified_at: None,
            created_at: Utc::now(),
        }
    }

    fn vendor_role() -> RoleAssignment {
        RoleAssignment {
            role: Role::Vendor,
            is_active: false,
        }
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let store = InMemoryUserStore::new();
        let tx = store.begin().await.unwrap();
        let u = store.create_user(tx, user("v@x.com")).await.unwrap();
        store.assign_role(tx, u.id, vendor_role()).await.unwrap();

        assert!(store.get_user(u.id).await.unwrap().is_none());
        assert!(store.roles_of(None, u.id).await.unwrap().is_empty());
        assert_eq!(store.roles_of(Some(tx), u.id).await.unwrap().len(), 1);

        store.commit(tx).await.unwrap();
        assert!(store.get_user(u.id).await.unwrap().is_some());
        assert_eq!(store.roles_of(None, u.id).await.unwrap(), vec![vendor_role()]);
    }

    #[tokio::test]
    async fn test_rollback_discards_and_is_idempotent() {
        let store = InMemoryUserStore::new();
        let tx = store.begin().await.unwrap();
        store.create_user(tx, user("v@x.com")).await.unwrap();

        store.rollback(tx).await.unwrap();
        store.rollback(tx).await.unwrap();

        assert_eq!(store.user_count().await, 0);
        assert_eq!(store.open_transactions().await, 0);
        assert!(matches!(
            store.commit(tx).await,
            Err(IdentityError::UnknownTransaction(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_across_transactions() {
        let store = InMemoryUserStore::new();
        let first = store.begin().await.unwrap();
        store.create_user(first, user("v@x.com")).await.unwrap();

        let second = store.begin().await.unwrap();
        let err = store.create_user(second, user("v@x.com")).await.unwrap_err();
        assert!(matches!(err, IdentityError::EmailTaken));
    }

    #[tokio::test]
    async fn test_dropped_role_writes() {
        let store = InMemoryUserStore::new();
        store.set_drop_role_writes(true);
        let tx = store.begin().await.unwrap();
        let u = store.create_user(tx, user("v@x.com")).await.unwrap();
        store.assign_role(tx, u.id, vendor_role()).await.unwrap();
        assert!(store.roles_of(Some(tx), u.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tokens_are_single_use() {
        let store = InMemoryUserStore::new();
        store
            .save_token(VerificationToken {
                token: "tok".into(),
                user_id: UserId::new(),
                expires_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(store.take_token("tok").await.unwrap().is_some());
        assert!(store.take_token("tok").await.unwrap().is_none());
    }
}

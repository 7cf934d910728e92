use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{RequestContext, UserId};
use uuid::Uuid;

use super::{
    Argon2PasswordHasher, IdentityError, NewUser, PasswordHasher, Role, RoleAssignment, User,
    UserStore, UserTx, VerificationToken,
};
use crate::validation::{has_min_chars, is_valid_email, normalize_email};

const MIN_PASSWORD_CHARS: usize = 6;

/// A user staged inside an open transaction.
#[derive(Debug, Clone)]
pub struct PendingUser {
    pub tx: UserTx,
    pub user: User,
}

/// Accounts, roles and email verification.
pub struct IdentityService<S: UserStore> {
    store: S,
    hasher: Arc<dyn PasswordHasher>,
    token_ttl: Duration,
}

impl<S: UserStore> IdentityService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            hasher: Arc::new(Argon2PasswordHasher::new()),
            token_ttl: Duration::hours(24),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Opens a local transaction and stages a user holding `role`.
    ///
    /// The role starts inactive; it is activated once the vendor has paid.
    /// Nothing is visible to other readers until [`Self::commit`].
    #[tracing::instrument(skip(self, ctx, new_user), fields(correlation_id = %ctx.correlation_id(), email = %new_user.email))]
    pub async fn begin_registration(
        &self,
        ctx: &RequestContext,
        new_user: NewUser,
        role: Role,
    ) -> Result<PendingUser, IdentityError> {
        let email = normalize_email(&new_user.email);
        if !is_valid_email(&email) {
            return Err(IdentityError::Validation("email must be a valid address".into()));
        }
        if !has_min_chars(&new_user.name, 1) {
            return Err(IdentityError::Validation("name must be provided".into()));
        }
        if new_user.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(IdentityError::Validation(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(IdentityError::EmailTaken);
        }

        // Hashing blocks for tens of milliseconds.
        let hasher = self.hasher.clone();
        let password = new_user.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| IdentityError::Hashing(e.to_string()))??;

        let tx = self.store.begin().await?;
        let staged = async {
            let user = self
                .store
                .create_user(
                    tx,
                    User {
                        id: UserId::new(),
                        name: new_user.name.trim().to_string(),
                        email,
                        password_hash,
                        is_verified: false,
                        verified_at: None,
                        created_at: Utc::now(),
                    },
                )
                .await?;
            self.store
                .assign_role(
                    tx,
                    user.id,
                    RoleAssignment {
                        role,
                        is_active: role != Role::Vendor,
                    },
                )
                .await?;
            Ok::<_, IdentityError>(user)
        }
        .await;

        match staged {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "user staged");
                Ok(PendingUser { tx, user })
            }
            Err(e) => {
                self.store.rollback(tx).await?;
                Err(e)
            }
        }
    }

    /// Confirms the role write landed inside `tx`.
    pub async fn ensure_role(
        &self,
        tx: UserTx,
        user_id: UserId,
        role: Role,
    ) -> Result<(), IdentityError> {
        let roles = self.store.roles_of(Some(tx), user_id).await?;
        if roles.iter().any(|a| a.role == role) {
            Ok(())
        } else {
            Err(IdentityError::RoleNotAssigned { user_id, role })
        }
    }

    pub async fn commit(&self, tx: UserTx) -> Result<(), IdentityError> {
        self.store.commit(tx).await
    }

    pub async fn rollback(&self, tx: UserTx) -> Result<(), IdentityError> {
        self.store.rollback(tx).await
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, IdentityError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound(user_id))
    }

    pub async fn roles_of(&self, user_id: UserId) -> Result<Vec<RoleAssignment>, IdentityError> {
        self.store.roles_of(None, user_id).await
    }

    /// Activates a committed role. Returns whether anything changed.
    #[tracing::instrument(skip(self))]
    pub async fn activate_role(&self, user_id: UserId, role: Role) -> Result<bool, IdentityError> {
        let changed = self.store.set_role_active(user_id, role, true).await?;
        if changed {
            tracing::info!("role activated");
        }
        Ok(changed)
    }

    pub async fn issue_verification_token(
        &self,
        user_id: UserId,
    ) -> Result<VerificationToken, IdentityError> {
        let token = VerificationToken {
            token: Uuid::new_v4().simple().to_string(),
            user_id,
            expires_at: Utc::now() + self.token_ttl,
        };
        self.store.save_token(token.clone()).await?;
        Ok(token)
    }

    /// Consumes a verification token and marks its user verified.
    #[tracing::instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<User, IdentityError> {
        let stored = self
            .store
            .take_token(token)
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        if stored.expires_at <= Utc::now() {
            return Err(IdentityError::TokenExpired);
        }

        let mut user = self.get_user(stored.user_id).await?;
        if !user.is_verified {
            user.is_verified = true;
            user.verified_at = Some(Utc::now());
            self.store.update_user(user.clone()).await?;
            tracing::info!(user_id = %user.id, "email verified");
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryUserStore;

    fn service() -> IdentityService<InMemoryUserStore> {
        IdentityService::new(InMemoryUserStore::new())
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Vendor X".into(),
            email: email.into(),
            password: "secret123".into(),
        }
    }

    #[tokio::test]
    async fn test_password_is_stored_as_argon2id() {
        let svc = service();
        let ctx = RequestContext::new("req-1");

        let pending = svc
            .begin_registration(&ctx, new_user("hash@x.com"), Role::Vendor)
            .await
            .unwrap();

        let stored = &pending.user.password_hash;
        assert!(stored.starts_with("$argon2id$"));
        assert!(Argon2PasswordHasher::new().verify("secret123", stored));
        assert!(!Argon2PasswordHasher::new().verify("secret124", stored));
    }

    #[tokio::test]
    async fn test_registration_commit_flow() {
        let svc = service();
        let ctx = RequestContext::new("req-1");

        let pending = svc
            .begin_registration(&ctx, new_user("V@X.com"), Role::Vendor)
            .await
            .unwrap();
        assert_eq!(pending.user.email, "v@x.com");
        svc.ensure_role(pending.tx, pending.user.id, Role::Vendor)
            .await
            .unwrap();
        svc.commit(pending.tx).await.unwrap();

        let roles = svc.roles_of(pending.user.id).await.unwrap();
        assert_eq!(
            roles,
            vec![RoleAssignment {
                role: Role::Vendor,
                is_active: false
            }]
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let svc = service();
        let ctx = RequestContext::new("req-1");
        let pending = svc
            .begin_registration(&ctx, new_user("v@x.com"), Role::Vendor)
            .await
            .unwrap();
        svc.commit(pending.tx).await.unwrap();

        let err = svc
            .begin_registration(&ctx, new_user("v@x.com"), Role::Vendor)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailTaken));
        assert_eq!(err.to_string(), "email has been taken");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let svc = service();
        let ctx = RequestContext::new("req-1");
        let mut bad = new_user("not-an-email");
        assert!(matches!(
            svc.begin_registration(&ctx, bad.clone(), Role::Vendor).await,
            Err(IdentityError::Validation(_))
        ));
        bad.email = "v@x.com".into();
        bad.password = "123".into();
        assert!(matches!(
            svc.begin_registration(&ctx, bad, Role::Vendor).await,
            Err(IdentityError::Validation(_))
        ));
        assert_eq!(svc.store().open_transactions().await, 0);
    }

    #[tokio::test]
    async fn test_missing_role_detected() {
        let svc = service();
        svc.store().set_drop_role_writes(true);
        let ctx = RequestContext::new("req-1");
        let pending = svc
            .begin_registration(&ctx, new_user("v@x.com"), Role::Vendor)
            .await
            .unwrap();
        let err = svc
            .ensure_role(pending.tx, pending.user.id, Role::Vendor)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::RoleNotAssigned { .. }));
    }

    #[tokio::test]
    async fn test_activate_role_is_idempotent() {
        let svc = service();
        let ctx = RequestContext::new("req-1");
        let pending = svc
            .begin_registration(&ctx, new_user("v@x.com"), Role::Vendor)
            .await
            .unwrap();
        svc.commit(pending.tx).await.unwrap();

        assert!(svc.activate_role(pending.user.id, Role::Vendor).await.unwrap());
        assert!(!svc.activate_role(pending.user.id, Role::Vendor).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_email_consumes_token() {
        let svc = service();
        let ctx = RequestContext::new("req-1");
        let pending = svc
            .begin_registration(&ctx, new_user("v@x.com"), Role::Vendor)
            .await
            .unwrap();
        svc.commit(pending.tx).await.unwrap();

        let token = svc.issue_verification_token(pending.user.id).await.unwrap();
        let user = svc.verify_email(&token.token).await.unwrap();
        assert!(user.is_verified);
        assert!(user.verified_at.is_some());
        assert!(matches!(
            svc.verify_email(&token.token).await,
            Err(IdentityError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let svc = service().with_token_ttl(Duration::seconds(-1));
        let ctx = RequestContext::new("req-1");
        let pending = svc
            .begin_registration(&ctx, new_user("v@x.com"), Role::Vendor)
            .await
            .unwrap();
        svc.commit(pending.tx).await.unwrap();

        let token = svc.issue_verification_token(pending.user.id).await.unwrap();
        assert!(matches!(
            svc.verify_email(&token.token).await,
            Err(IdentityError::TokenExpired)
        ));
    }
}

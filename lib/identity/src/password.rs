//! Email/password login and first-admin bootstrap.

use rootcause::Report;
use std::sync::{Arc, OnceLock};
use tracing::{info, instrument, warn};

use crate::error::AuthError;
use crate::jwt::JwtIssuer;
use crate::role::{ADMIN_ROLE, Role};
use crate::store::{RoleStore, UserStore};
use crate::user::User;

/// Result of a successful password login.
#[derive(Debug, Clone)]
pub struct PasswordLogin {
    /// Signed session token.
    pub token: String,
    pub user: User,
    /// Name of the user's role, if one is assigned.
    pub role: Option<String>,
}

/// Result of a successful admin bootstrap.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub user: User,
    pub role: Role,
}

/// Password-based authentication against local users.
pub struct PasswordAuthService {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    issuer: JwtIssuer,
    bcrypt_cost: u32,
    /// Hash checked when no user matches, so a miss costs as much as a hit.
    dummy_hash: OnceLock<Option<String>>,
}

impl PasswordAuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        issuer: JwtIssuer,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            roles,
            issuer,
            bcrypt_cost,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Authenticates with email and password and issues a session token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when the user does not exist,
    /// has no password, or the password does not match.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordLogin, Report<AuthError>> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(|e| AuthError::storage("looking up user by email", e))?;

        let credentials = user.and_then(|u| {
            let hash = u.password_hash()?.to_string();
            Some((u, hash))
        });

        let Some((user, hash)) = credentials else {
            if let Some(dummy) = self.dummy_hash().await {
                let _equalized = verify_password(password.to_string(), dummy).await.ok();
            }
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(password.to_string(), hash).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let role = match user.role_id() {
            Some(role_id) => self
                .roles
                .find_by_id(role_id)
                .await
                .map_err(|e| AuthError::storage("loading role", e))?
                .map(|r| r.name().to_string()),
            None => None,
        };

        let token = self.issuer.issue(user.id(), user.email().unwrap_or_default())?;
        info!(user_id = %user.id(), "password login succeeded");

        Ok(PasswordLogin { token, user, role })
    }

    /// Creates or promotes the first admin user.
    ///
    /// An existing user with `email` is promoted and given the password;
    /// otherwise a new user is created.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AdminAlreadyExists` if any user already holds the
    /// admin role.
    #[instrument(skip(self, password))]
    pub async fn init_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AdminAccount, Report<AuthError>> {
        let role = self.ensure_admin_role().await?;

        let admins = self
            .users
            .count_with_role(role.id())
            .await
            .map_err(|e| AuthError::storage("counting admins", e))?;
        if admins > 0 {
            return Err(AuthError::AdminAlreadyExists.into());
        }

        let hash = hash_password(password.to_string(), self.bcrypt_cost).await?;

        let existing = self
            .users
            .find_by_email(email)
            .await
            .map_err(|e| AuthError::storage("looking up user by email", e))?;

        let user = match existing {
            Some(mut user) => {
                user.set_password_hash(Some(hash));
                user.set_name(Some(name.to_string()));
                user.set_role(Some(role.id()));
                self.users
                    .update(&user)
                    .await
                    .map_err(|e| AuthError::storage("promoting user to admin", e))?;
                info!(user_id = %user.id(), "existing user promoted to admin");
                user
            }
            None => {
                let mut user = User::new(Some(email.to_string()), Some(name.to_string()));
                user.set_password_hash(Some(hash));
                user.set_role(Some(role.id()));
                self.users
                    .create(&user)
                    .await
                    .map_err(|e| AuthError::storage("creating admin user", e))?;
                info!(user_id = %user.id(), "admin user created");
                user
            }
        };

        Ok(AdminAccount { user, role })
    }

    async fn ensure_admin_role(&self) -> Result<Role, Report<AuthError>> {
        if let Some(role) = self.find_admin_role().await? {
            return Ok(role);
        }

        let role = Role::admin();
        match self.roles.create(&role).await {
            Ok(()) => Ok(role),
            Err(e) if e.is_conflict() => {
                self.find_admin_role().await?.ok_or_else(|| {
                    AuthError::Storage {
                        step: "creating admin role".to_string(),
                        details: "role vanished after conflict".to_string(),
                    }
                    .into()
                })
            }
            Err(e) => Err(AuthError::storage("creating admin role", e).into()),
        }
    }

    async fn find_admin_role(&self) -> Result<Option<Role>, Report<AuthError>> {
        self.roles
            .find_by_name(ADMIN_ROLE)
            .await
            .map_err(|e| AuthError::storage("loading admin role", e).into())
    }

    async fn dummy_hash(&self) -> Option<String> {
        if let Some(hash) = self.dummy_hash.get() {
            return hash.clone();
        }
        let hash = hash_password("tollgate-timing-equalizer".to_string(), self.bcrypt_cost)
            .await
            .ok();
        self.dummy_hash.get_or_init(|| hash).clone()
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String, Report<AuthError>> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing {
            details: e.to_string(),
        })?;
    hashed.map_err(|e| {
        AuthError::Hashing {
            details: e.to_string(),
        }
        .into()
    })
}

async fn verify_password(password: String, hash: String) -> Result<bool, Report<AuthError>> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hashing {
            details: e.to_string(),
        })?;
    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!(error = %e, "stored password hash is unreadable");
            Ok(false)
        }
    }
}

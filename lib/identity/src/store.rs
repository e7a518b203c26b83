//! Storage traits for users, identities and roles.
//!
//! The server implements these over Postgres. Implementations must report a
//! unique-constraint violation as [`StoreError::Conflict`] so the linker can
//! tell a lost race from a backend failure.

use async_trait::async_trait;
use tollgate_core::{RoleId, UserId};

use crate::error::StoreError;
use crate::identity::Identity;
use crate::provider::ProviderName;
use crate::role::Role;
use crate::user::User;

/// Persistence for local users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Looks up a user by exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a new user. Fails with `Conflict` if the email is taken.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    /// Overwrites a user's mutable fields.
    async fn update(&self, user: &User) -> Result<(), StoreError>;

    /// Counts users assigned to `role_id`.
    async fn count_with_role(&self, role_id: RoleId) -> Result<u64, StoreError>;
}

/// Persistence for federated identities.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Looks up the identity for a provider account.
    async fn find_by_provider_subject(
        &self,
        provider: ProviderName,
        subject: &str,
    ) -> Result<Option<Identity>, StoreError>;

    /// Inserts an identity for an existing user.
    ///
    /// Fails with `Conflict` if `(provider, subject)` is already linked.
    async fn create(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Overwrites an identity's profile mirror and tokens.
    async fn update(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Inserts a new user together with its first identity, atomically.
    ///
    /// Either both rows are written or neither is. Fails with `Conflict` if
    /// the email or the provider account is already taken.
    async fn create_with_user(&self, user: &User, identity: &Identity) -> Result<(), StoreError>;
}

/// Persistence for roles.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    /// Inserts a role. Fails with `Conflict` if the name is taken.
    async fn create(&self, role: &Role) -> Result<(), StoreError>;
}

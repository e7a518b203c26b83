//! In-memory store implementations for tests.
//!
//! Enforces the same unique constraints as the Postgres schema so conflict
//! handling can be exercised without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tollgate_core::{IdentityId, RoleId, UserId};

use crate::error::StoreError;
use crate::identity::Identity;
use crate::provider::ProviderName;
use crate::role::Role;
use crate::store::{IdentityStore, RoleStore, UserStore};
use crate::user::User;

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    identities: HashMap<IdentityId, Identity>,
    roles: HashMap<RoleId, Role>,
}

impl State {
    fn email_taken(&self, email: Option<&str>, except: UserId) -> bool {
        email.is_some_and(|email| {
            self.users
                .values()
                .any(|u| u.id() != except && u.email() == Some(email))
        })
    }

    fn account_taken(&self, identity: &Identity) -> bool {
        self.identities.values().any(|i| {
            i.id() != identity.id()
                && i.provider() == identity.provider()
                && i.subject() == identity.subject()
        })
    }
}

/// A user, identity and role store backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.lock().map(|s| s.users.len()).unwrap_or_default()
    }

    /// Returns the number of stored identities.
    #[must_use]
    pub fn identity_count(&self) -> usize {
        self.lock().map(|s| s.identities.len()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Backend {
            details: "memory store lock poisoned".to_string(),
        })
    }
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict {
        constraint: constraint.to_string(),
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email() == Some(email))
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.users.contains_key(&user.id()) {
            return Err(conflict("users_pkey"));
        }
        if state.email_taken(user.email(), user.id()) {
            return Err(conflict("users_email_key"));
        }
        state.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.email_taken(user.email(), user.id()) {
            return Err(conflict("users_email_key"));
        }
        state.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn count_with_role(&self, role_id: RoleId) -> Result<u64, StoreError> {
        let count = self
            .lock()?
            .users
            .values()
            .filter(|u| u.role_id() == Some(role_id))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_by_provider_subject(
        &self,
        provider: ProviderName,
        subject: &str,
    ) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .lock()?
            .identities
            .values()
            .find(|i| i.provider() == provider && i.subject() == subject)
            .cloned())
    }

    async fn create(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&identity.user_id()) {
            return Err(StoreError::Backend {
                details: "identities_user_id_fkey".to_string(),
            });
        }
        if state.account_taken(identity) {
            return Err(conflict("identities_provider_subject_key"));
        }
        state.identities.insert(identity.id(), identity.clone());
        Ok(())
    }

    async fn update(&self, identity: &Identity) -> Result<(), StoreError> {
        self.lock()?
            .identities
            .insert(identity.id(), identity.clone());
        Ok(())
    }

    async fn create_with_user(&self, user: &User, identity: &Identity) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.email_taken(user.email(), user.id()) {
            return Err(conflict("users_email_key"));
        }
        if state.account_taken(identity) {
            return Err(conflict("identities_provider_subject_key"));
        }
        state.users.insert(user.id(), user.clone());
        state.identities.insert(identity.id(), identity.clone());
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.lock()?.roles.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self
            .lock()?
            .roles
            .values()
            .find(|r| r.name() == name)
            .cloned())
    }

    async fn create(&self, role: &Role) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.roles.values().any(|r| r.name() == role.name()) {
            return Err(conflict("roles_name_key"));
        }
        state.roles.insert(role.id(), role.clone());
        Ok(())
    }
}

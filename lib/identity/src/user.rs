//! User domain type.
//!
//! A User is the local account every login path resolves to. Users are
//! created either by the admin bootstrap or by a first federated login, and
//! are never deleted by the authentication subsystem.

use chrono::{DateTime, Utc};
use std::fmt;
use tollgate_core::{RoleId, UserId};

/// A local user account.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Internal user ID, carried as the `sub` claim of session tokens.
    id: UserId,
    /// Email address. Unique when present; federated users may have none.
    email: Option<String>,
    /// Display name.
    name: Option<String>,
    /// bcrypt hash of the user's password, if password login is enabled.
    password_hash: Option<String>,
    /// Avatar URL.
    avatar: Option<String>,
    /// Assigned role, if any.
    role_id: Option<RoleId>,
    /// When the user record was created.
    created_at: DateTime<Utc>,
    /// When the user record was last updated.
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with a generated ID.
    #[must_use]
    pub fn new(email: Option<String>, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            name,
            password_hash: None,
            avatar: None,
            role_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        email: Option<String>,
        name: Option<String>,
        password_hash: Option<String>,
        avatar: Option<String>,
        role_id: Option<RoleId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            name,
            password_hash,
            avatar,
            role_id,
            created_at,
            updated_at,
        }
    }

    /// Sets the avatar while building a new user.
    #[must_use]
    pub fn with_avatar(mut self, avatar: Option<String>) -> Self {
        self.avatar = avatar;
        self
    }

    /// Returns the user's ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the user's email address, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the stored password hash, treating an empty hash as absent.
    #[must_use]
    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref().filter(|h| !h.is_empty())
    }

    /// Returns the avatar URL, if any.
    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    /// Returns the assigned role.
    #[must_use]
    pub fn role_id(&self) -> Option<RoleId> {
        self.role_id
    }

    /// Returns when the user was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the user was last updated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    /// Sets the password hash.
    pub fn set_password_hash(&mut self, hash: Option<String>) {
        self.password_hash = hash;
        self.updated_at = Utc::now();
    }

    /// Assigns a role.
    pub fn set_role(&mut self, role_id: Option<RoleId>) {
        self.role_id = role_id;
        self.updated_at = Utc::now();
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("avatar", &self.avatar)
            .field("role_id", &self.role_id)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_no_credentials_or_role() {
        let user = User::new(Some("a@x.com".to_string()), None);
        assert_eq!(user.email(), Some("a@x.com"));
        assert!(user.password_hash().is_none());
        assert!(user.role_id().is_none());
        assert_eq!(user.created_at(), user.updated_at());
    }

    #[test]
    fn empty_password_hash_counts_as_absent() {
        let mut user = User::new(None, None);
        user.set_password_hash(Some(String::new()));
        assert!(user.password_hash().is_none());
    }

    #[test]
    fn set_role_updates_timestamp() {
        let mut user = User::new(None, Some("Root".to_string()));
        let original_updated_at = user.updated_at();

        std::thread::sleep(std::time::Duration::from_millis(1));

        let role = RoleId::new();
        user.set_role(Some(role));

        assert_eq!(user.role_id(), Some(role));
        assert!(user.updated_at() > original_updated_at);
    }

    #[test]
    fn with_all_fields_preserves_values() {
        let id = UserId::new();
        let role = RoleId::new();
        let created = Utc::now() - chrono::Duration::days(30);
        let updated = Utc::now() - chrono::Duration::days(1);

        let user = User::with_all_fields(
            id,
            Some("alice@example.com".to_string()),
            Some("Alice".to_string()),
            Some("$2b$04$hash".to_string()),
            Some("https://cdn.example.com/a.png".to_string()),
            Some(role),
            created,
            updated,
        );

        assert_eq!(user.id(), id);
        assert_eq!(user.name(), Some("Alice"));
        assert_eq!(user.password_hash(), Some("$2b$04$hash"));
        assert_eq!(user.avatar(), Some("https://cdn.example.com/a.png"));
        assert_eq!(user.role_id(), Some(role));
        assert_eq!(user.created_at(), created);
        assert_eq!(user.updated_at(), updated);
    }

    #[test]
    fn debug_redacts_password_hash() {
        let mut user = User::new(None, None);
        user.set_password_hash(Some("$2b$12$supersecret".to_string()));
        assert!(!format!("{user:?}").contains("supersecret"));
    }
}

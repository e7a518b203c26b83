//! Role records.
//!
//! Roles are rows, not an enum: the admin bootstrap creates the `admin` role
//! on demand and further roles can be added without a code change.

use chrono::{DateTime, Utc};
use tollgate_core::RoleId;

/// Name of the role granted by the admin bootstrap.
pub const ADMIN_ROLE: &str = "admin";

/// Description stored when the admin role is created.
pub(crate) const ADMIN_ROLE_DESCRIPTION: &str = "Administrator role with full system access";

/// A named role that can be assigned to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    id: RoleId,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Role {
    /// Creates a new role with a generated ID.
    #[must_use]
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RoleId::new(),
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates the admin role.
    #[must_use]
    pub fn admin() -> Self {
        Self::new(ADMIN_ROLE, Some(ADMIN_ROLE_DESCRIPTION.to_string()))
    }

    /// Reconstitutes a role from storage.
    #[must_use]
    pub fn with_all_fields(
        id: RoleId,
        name: String,
        description: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if this is the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.name == ADMIN_ROLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_has_fixed_name_and_description() {
        let role = Role::admin();
        assert_eq!(role.name(), "admin");
        assert_eq!(
            role.description(),
            Some("Administrator role with full system access")
        );
        assert!(role.is_admin());
    }

    #[test]
    fn other_roles_are_not_admin() {
        assert!(!Role::new("viewer", None).is_admin());
    }
}

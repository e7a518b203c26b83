//! Role repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tollgate_core::RoleId;
use tollgate_identity::{Role, RoleStore, StoreError};
use uuid::Uuid;

use super::store_error;

#[derive(FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role::with_all_fields(
            RoleId::from_uuid(row.id),
            row.name,
            row.description,
            row.created_at,
            row.updated_at,
        )
    }
}

/// Repository for role operations.
#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Creates a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for RoleRepository {
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        let row: Option<RoleRow> = sqlx::query_as(
            "SELECT id, name, description, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(Role::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let row: Option<RoleRow> = sqlx::query_as(
            "SELECT id, name, description, created_at, updated_at FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(Role::from))
    }

    async fn create(&self, role: &Role) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.name())
        .bind(role.description())
        .bind(role.created_at())
        .bind(role.updated_at())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }
}

//! User repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use tollgate_core::{RoleId, UserId};
use tollgate_identity::{StoreError, User, UserStore};
use uuid::Uuid;

use super::store_error;

const USER_COLUMNS: &str =
    "id, email, name, password_hash, avatar, role_id, created_at, updated_at";

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: Option<String>,
    name: Option<String>,
    password_hash: Option<String>,
    avatar: Option<String>,
    role_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::with_all_fields(
            UserId::from_uuid(row.id),
            row.email,
            row.name,
            row.password_hash,
            row.avatar,
            row.role_id.map(RoleId::from_uuid),
            row.created_at,
            row.updated_at,
        )
    }
}

/// Repository for user operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Inserts a user using any executor, so identity creation can reuse it
/// inside its transaction.
pub(super) async fn insert_user<'e, E>(executor: E, user: &User) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, avatar, role_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(user.id().as_uuid())
    .bind(user.email())
    .bind(user.name())
    .bind(user.password_hash())
    .bind(user.avatar())
    .bind(user.role_id().map(|r| r.as_uuid()))
    .bind(user.created_at())
    .bind(user.updated_at())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(row.map(User::from))
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        insert_user(&self.pool, user).await.map_err(store_error)
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, name = $3, password_hash = $4, avatar = $5, role_id = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email())
        .bind(user.name())
        .bind(user.password_hash())
        .bind(user.avatar())
        .bind(user.role_id().map(|r| r.as_uuid()))
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn count_with_role(&self, role_id: RoleId) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(count.unsigned_abs())
    }
}

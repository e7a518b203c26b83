//! Identity repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use tollgate_core::{IdentityId, UserId};
use tollgate_identity::{Identity, IdentityStore, ProviderName, SealedToken, StoreError, User};
use uuid::Uuid;

use super::user::insert_user;
use super::{decode_error, store_error};

/// Row type for identity queries.
#[derive(FromRow)]
struct IdentityRow {
    id: Uuid,
    user_id: Uuid,
    provider: String,
    subject: String,
    email: Option<String>,
    name: Option<String>,
    avatar: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn try_into_identity(self) -> Result<Identity, StoreError> {
        let provider: ProviderName = self.provider.parse().map_err(|e| {
            decode_error(format!("identity {} has bad provider: {e}", self.id))
        })?;
        Ok(Identity::with_all_fields(
            IdentityId::from_uuid(self.id),
            UserId::from_uuid(self.user_id),
            provider,
            self.subject,
            self.email,
            self.name,
            self.avatar,
            self.access_token.map(SealedToken::from_stored),
            self.refresh_token.map(SealedToken::from_stored),
            self.expires_at,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Repository for identity operations.
#[derive(Clone)]
pub struct IdentityRepository {
    pool: PgPool,
}

impl IdentityRepository {
    /// Creates a new identity repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_identity<'e, E>(executor: E, identity: &Identity) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO identities (
            id, user_id, provider, subject, email, name, avatar,
            access_token, refresh_token, expires_at, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(identity.id().as_uuid())
    .bind(identity.user_id().as_uuid())
    .bind(identity.provider().as_str())
    .bind(identity.subject())
    .bind(identity.email())
    .bind(identity.name())
    .bind(identity.avatar())
    .bind(identity.access_token().map(SealedToken::as_str))
    .bind(identity.refresh_token().map(SealedToken::as_str))
    .bind(identity.expires_at())
    .bind(identity.created_at())
    .bind(identity.updated_at())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl IdentityStore for IdentityRepository {
    async fn find_by_provider_subject(
        &self,
        provider: ProviderName,
        subject: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, provider, subject, email, name, avatar,
                   access_token, refresh_token, expires_at, created_at, updated_at
            FROM identities
            WHERE provider = $1 AND subject = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(IdentityRow::try_into_identity).transpose()
    }

    async fn create(&self, identity: &Identity) -> Result<(), StoreError> {
        insert_identity(&self.pool, identity)
            .await
            .map_err(store_error)
    }

    async fn update(&self, identity: &Identity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE identities
            SET email = $2, name = $3, avatar = $4,
                access_token = $5, refresh_token = $6, expires_at = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(identity.id().as_uuid())
        .bind(identity.email())
        .bind(identity.name())
        .bind(identity.avatar())
        .bind(identity.access_token().map(SealedToken::as_str))
        .bind(identity.refresh_token().map(SealedToken::as_str))
        .bind(identity.expires_at())
        .bind(identity.updated_at())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn create_with_user(&self, user: &User, identity: &Identity) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        insert_user(&mut *tx, user).await.map_err(store_error)?;
        insert_identity(&mut *tx, identity)
            .await
            .map_err(store_error)?;
        tx.commit().await.map_err(store_error)
    }
}

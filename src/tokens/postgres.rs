use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::record::RefreshTokenRecord;
use super::store::{RotationOutcome, TokenRecordStore};
use crate::error::AppError;

const RECORD_COLUMNS: &str = "id, token_hash, user_id, created_at, expires_at, is_revoked, \
     revoked_at, reason_revoked, token_family, parent_token_id, replaced_by_token_id";

/// `TokenRecordStore` over the `refresh_tokens` table
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRecordStore for PgTokenStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        insert_record(&self.pool, record).await
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(&format!(
            "SELECT {} FROM refresh_tokens WHERE token_hash = $1",
            RECORD_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(&format!(
            "SELECT {} FROM refresh_tokens WHERE id = $1",
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_family(
        &self,
        family: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let records = sqlx::query_as::<_, RefreshTokenRecord>(&format!(
            "SELECT {} FROM refresh_tokens WHERE token_family = $1 AND user_id = $2 \
             ORDER BY created_at",
            RECORD_COLUMNS
        ))
        .bind(family)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_open_families(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let families = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT token_family
            FROM refresh_tokens
            WHERE user_id = $1 AND is_revoked = false
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(families)
    }

    async fn revoke_if_active(
        &self,
        id: Uuid,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = true, revoked_at = $1, reason_revoked = $2
            WHERE id = $3 AND is_revoked = false
            "#,
        )
        .bind(revoked_at)
        .bind(reason)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn rotate(
        &self,
        parent_id: Uuid,
        child: &RefreshTokenRecord,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<RotationOutcome, AppError> {
        let mut transaction = self.pool.begin().await?;

        // The child goes in first so the parent's forward reference is valid.
        insert_record(&mut transaction, child).await?;

        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = true, revoked_at = $1, reason_revoked = $2,
                replaced_by_token_id = $3
            WHERE id = $4 AND is_revoked = false
            "#,
        )
        .bind(revoked_at)
        .bind(reason)
        .bind(child.id)
        .bind(parent_id)
        .execute(&mut transaction)
        .await?;

        if result.rows_affected() == 0 {
            transaction.rollback().await?;
            return Ok(RotationOutcome::ParentAlreadyRevoked);
        }

        transaction.commit().await?;
        Ok(RotationOutcome::Rotated)
    }
}

async fn insert_record<'e, E>(executor: E, record: &RefreshTokenRecord) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (
            id, token_hash, user_id, created_at, expires_at, is_revoked,
            revoked_at, reason_revoked, token_family, parent_token_id, replaced_by_token_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(record.id)
    .bind(&record.token_hash)
    .bind(record.user_id)
    .bind(record.created_at)
    .bind(record.expires_at)
    .bind(record.is_revoked)
    .bind(record.revoked_at)
    .bind(&record.reason_revoked)
    .bind(record.token_family)
    .bind(record.parent_token_id)
    .bind(record.replaced_by_token_id)
    .execute(executor)
    .await?;

    Ok(())
}

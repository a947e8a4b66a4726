use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{UserAccount, UserCredentials, UserDirectory};
use crate::error::AppError;

/// `UserDirectory` over the `users` and `user_roles` tables
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, bool)>(
            "SELECT id, password_hash, is_active FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, password_hash, is_active)| UserCredentials {
            id,
            password_hash,
            is_active,
        }))
    }

    async fn find_active(&self, user_id: Uuid) -> Result<Option<UserAccount>, AppError> {
        let user = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, email FROM users WHERE id = $1 AND is_active = true",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let (id, email) = match user {
            Some(user) => user,
            None => return Ok(None),
        };

        let roles = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(UserAccount { id, email, roles }))
    }
}

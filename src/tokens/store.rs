use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::record::RefreshTokenRecord;
use crate::error::AppError;

/// Result of an attempted rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Parent revoked, linked to the child, child stored.
    Rotated,
    /// Someone else revoked the parent first. Nothing was written.
    ParentAlreadyRevoked,
}

/// Durable storage for refresh token records
///
/// Every mutating operation is conditional on the target still being
/// unrevoked, so concurrent callers can never revive or double-rotate a record.
#[async_trait]
pub trait TokenRecordStore: Send + Sync {
    /// Persist a new record. Fails if `token_hash` is already taken.
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// All records of `family` owned by `user_id`, oldest first.
    async fn find_family(
        &self,
        family: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<RefreshTokenRecord>, AppError>;

    /// Families of `user_id` that still contain at least one unrevoked record.
    async fn find_open_families(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Revoke `id` if it is not revoked yet. Returns whether this call revoked it.
    async fn revoke_if_active(
        &self,
        id: Uuid,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<bool, AppError>;

    /// Atomically revoke `parent_id` with `reason`, point its
    /// `replaced_by_token_id` at `child`, and store `child`.
    ///
    /// Conditional on the parent being unrevoked; on a lost race nothing is
    /// written and `ParentAlreadyRevoked` is returned.
    async fn rotate(
        &self,
        parent_id: Uuid,
        child: &RefreshTokenRecord,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<RotationOutcome, AppError>;
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::record::RefreshTokenRecord;
use super::store::{RotationOutcome, TokenRecordStore};
use crate::error::{AppError, DatabaseError};

#[derive(Default)]
struct Records {
    by_id: HashMap<Uuid, RefreshTokenRecord>,
    by_hash: HashMap<String, Uuid>,
}

impl Records {
    fn insert(&mut self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        if self.by_hash.contains_key(&record.token_hash) || self.by_id.contains_key(&record.id) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "refresh token already exists".to_string(),
            )));
        }
        self.by_hash.insert(record.token_hash.clone(), record.id);
        self.by_id.insert(record.id, record.clone());
        Ok(())
    }
}

/// `TokenRecordStore` kept in process memory.
///
/// One mutex guards every record, which makes `rotate` a single critical
/// section. Used by the test-suite.
#[derive(Default)]
pub struct InMemoryTokenStore {
    records: Mutex<Records>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored record, oldest first.
    pub async fn records(&self) -> Vec<RefreshTokenRecord> {
        let records = self.records.lock().await;
        let mut all: Vec<RefreshTokenRecord> = records.by_id.values().cloned().collect();
        all.sort_by_key(|r| r.created_at);
        all
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TokenRecordStore for InMemoryTokenStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        self.records.lock().await.insert(record)
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let records = self.records.lock().await;
        Ok(records
            .by_hash
            .get(token_hash)
            .and_then(|id| records.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(self.records.lock().await.by_id.get(&id).cloned())
    }

    async fn find_family(
        &self,
        family: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let records = self.records.lock().await;
        let mut members: Vec<RefreshTokenRecord> = records
            .by_id
            .values()
            .filter(|r| r.token_family == family && r.user_id == user_id)
            .cloned()
            .collect();
        members.sort_by_key(|r| r.created_at);
        Ok(members)
    }

    async fn find_open_families(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let records = self.records.lock().await;
        let families: BTreeSet<Uuid> = records
            .by_id
            .values()
            .filter(|r| r.user_id == user_id && !r.is_revoked)
            .map(|r| r.token_family)
            .collect();
        Ok(families.into_iter().collect())
    }

    async fn revoke_if_active(
        &self,
        id: Uuid,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<bool, AppError> {
        let mut records = self.records.lock().await;
        Ok(records
            .by_id
            .get_mut(&id)
            .map(|record| record.revoke(revoked_at, reason))
            .unwrap_or(false))
    }

    async fn rotate(
        &self,
        parent_id: Uuid,
        child: &RefreshTokenRecord,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<RotationOutcome, AppError> {
        let mut records = self.records.lock().await;

        match records.by_id.get(&parent_id) {
            None => {
                return Err(AppError::Database(DatabaseError::NotFound(
                    "parent refresh token".to_string(),
                )))
            }
            Some(parent) if parent.is_revoked => return Ok(RotationOutcome::ParentAlreadyRevoked),
            Some(_) => {}
        }

        records.insert(child)?;
        if let Some(parent) = records.by_id.get_mut(&parent_id) {
            parent.revoke(revoked_at, reason);
            parent.replaced_by_token_id = Some(child.id);
        }
        Ok(RotationOutcome::Rotated)
    }
}

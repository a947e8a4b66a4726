use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::record::REASON_REUSE_DETECTED;
use super::store::TokenRecordStore;
use crate::error::AppError;

/// Upper bound on family rescans in `revoke_family`.
const MAX_REVOKE_PASSES: usize = 8;

/// Kills a whole token family once one of its dead members is replayed.
#[derive(Clone)]
pub struct ReuseDetector {
    store: Arc<dyn TokenRecordStore>,
}

impl ReuseDetector {
    pub fn new(store: Arc<dyn TokenRecordStore>) -> Self {
        Self { store }
    }

    /// Revoke every still-active record of `family` owned by `user_id` with
    /// a "Token reuse detected" reason. Records that are already revoked keep
    /// their reason. Returns how many records this call revoked.
    pub async fn contain(&self, family: Uuid, user_id: Uuid) -> Result<usize, AppError> {
        let revoked = self.revoke_family(family, user_id, REASON_REUSE_DETECTED).await?;

        tracing::warn!(
            user_id = %user_id,
            family = %family,
            revoked = revoked,
            "Refresh token reuse detected, token family revoked"
        );

        Ok(revoked)
    }

    /// Bulk-revoke primitive shared with session logout.
    pub(crate) async fn revoke_family(
        &self,
        family: Uuid,
        user_id: Uuid,
        reason: &str,
    ) -> Result<usize, AppError> {
        let mut revoked = 0;

        // Rescan until a pass finds nothing active: a rotation that committed
        // after our read would otherwise leave its child live.
        for _ in 0..MAX_REVOKE_PASSES {
            let now = Utc::now();
            let active: Vec<Uuid> = self
                .store
                .find_family(family, user_id)
                .await?
                .into_iter()
                .filter(|record| !record.is_revoked)
                .map(|record| record.id)
                .collect();

            if active.is_empty() {
                return Ok(revoked);
            }

            for id in active {
                if self.store.revoke_if_active(id, now, reason).await? {
                    revoked += 1;
                }
            }
        }

        tracing::error!(
            user_id = %user_id,
            family = %family,
            revoked = revoked,
            "Token family still has active records after revocation"
        );
        Err(AppError::Internal(format!(
            "token family {} not fully revoked after {} passes",
            family, MAX_REVOKE_PASSES
        )))
    }
}

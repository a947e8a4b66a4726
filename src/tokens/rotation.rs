use chrono::{Duration, Utc};
use std::sync::Arc;

use super::generator::{hash_token, TokenGenerator};
use super::record::{RefreshTokenRecord, REASON_ROTATED};
use super::reuse::ReuseDetector;
use super::store::{RotationOutcome, TokenRecordStore};
use super::TokenPair;
use crate::auth::AccessTokenIssuer;
use crate::error::{AppError, RefreshRejection};
use crate::users::UserDirectory;

/// Exchanges a live refresh token for a new pair, retiring the old one.
#[derive(Clone)]
pub struct RotationEngine {
    store: Arc<dyn TokenRecordStore>,
    users: Arc<dyn UserDirectory>,
    issuer: Arc<dyn AccessTokenIssuer>,
    generator: Arc<dyn TokenGenerator>,
    detector: ReuseDetector,
    refresh_lifetime: Duration,
}

impl RotationEngine {
    pub fn new(
        store: Arc<dyn TokenRecordStore>,
        users: Arc<dyn UserDirectory>,
        issuer: Arc<dyn AccessTokenIssuer>,
        generator: Arc<dyn TokenGenerator>,
        detector: ReuseDetector,
        refresh_lifetime: Duration,
    ) -> Self {
        Self {
            store,
            users,
            issuer,
            generator,
            detector,
            refresh_lifetime,
        }
    }

    /// Validate `presented` and rotate it.
    ///
    /// Checks run in a fixed order: lookup, owner, expiry, revocation. Expiry
    /// is checked first so that an old, already rotated token which has also
    /// timed out is not treated as theft.
    ///
    /// # Errors
    /// `AuthError::RefreshRejected` for every rejection; `AppError::Database`
    /// when the store fails.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AppError> {
        let record = self
            .store
            .find_by_token_hash(&hash_token(presented))
            .await?
            .ok_or_else(|| AppError::refresh_rejected(RefreshRejection::TokenNotFound))?;

        let user = self
            .users
            .find_active(record.user_id)
            .await?
            .ok_or_else(|| AppError::refresh_rejected(RefreshRejection::UserMissing))?;

        let now = Utc::now();
        if record.is_expired_at(now) {
            tracing::info!(user_id = %record.user_id, "Refresh token expired");
            return Err(AppError::refresh_rejected(RefreshRejection::TokenExpired));
        }

        if record.is_revoked {
            return Err(self.replayed(&record).await?);
        }

        // Roles may have changed since the family was issued.
        let access = self.issuer.issue(user.id, &user.email, &user.roles)?;

        let refresh_token = self.generator.generate();
        let child = RefreshTokenRecord::child_of(
            &record,
            hash_token(&refresh_token),
            self.refresh_lifetime,
            now,
        );

        match self.store.rotate(record.id, &child, now, REASON_ROTATED).await? {
            RotationOutcome::Rotated => {}
            // Lost a race against another refresh of the same token.
            RotationOutcome::ParentAlreadyRevoked => return Err(self.replayed(&record).await?),
        }

        tracing::info!(
            user_id = %user.id,
            family = %record.token_family,
            "Refresh token rotated"
        );

        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            expires_in: access.expires_in,
        })
    }

    async fn replayed(&self, record: &RefreshTokenRecord) -> Result<AppError, AppError> {
        tracing::warn!(
            user_id = %record.user_id,
            family = %record.token_family,
            token_id = %record.id,
            "Revoked refresh token presented"
        );
        self.detector.contain(record.token_family, record.user_id).await?;
        Ok(AppError::refresh_rejected(RefreshRejection::TokenReplayed))
    }
}

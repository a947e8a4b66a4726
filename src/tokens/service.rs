use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::generator::{hash_token, TokenGenerator};
use super::issuance::IssuanceEntry;
use super::record::REASON_LOGOUT;
use super::reuse::ReuseDetector;
use super::rotation::RotationEngine;
use super::store::TokenRecordStore;
use super::TokenPair;
use crate::auth::AccessTokenIssuer;
use crate::error::AppError;
use crate::users::{UserAccount, UserDirectory};

/// Session operations exposed to the HTTP layer
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn TokenRecordStore>,
    issuance: IssuanceEntry,
    rotation: RotationEngine,
    detector: ReuseDetector,
}

impl TokenService {
    pub fn new(
        store: Arc<dyn TokenRecordStore>,
        users: Arc<dyn UserDirectory>,
        issuer: Arc<dyn AccessTokenIssuer>,
        generator: Arc<dyn TokenGenerator>,
        refresh_lifetime: Duration,
    ) -> Self {
        let detector = ReuseDetector::new(store.clone());
        let issuance = IssuanceEntry::new(
            store.clone(),
            issuer.clone(),
            generator.clone(),
            refresh_lifetime,
        );
        let rotation = RotationEngine::new(
            store.clone(),
            users,
            issuer,
            generator,
            detector.clone(),
            refresh_lifetime,
        );

        Self {
            store,
            issuance,
            rotation,
            detector,
        }
    }

    pub async fn issue(&self, user: &UserAccount) -> Result<TokenPair, AppError> {
        self.issuance.issue(user).await
    }

    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AppError> {
        self.rotation.refresh(presented).await
    }

    /// End the session the presented token belongs to.
    ///
    /// Unknown tokens are ignored so the caller learns nothing from the result.
    /// A dead but unexpired token is handled like a replayed refresh: the
    /// family is contained with the reuse reason, not the logout reason.
    pub async fn logout(&self, presented: &str) -> Result<usize, AppError> {
        let record = match self.store.find_by_token_hash(&hash_token(presented)).await? {
            Some(record) => record,
            None => return Ok(0),
        };

        if record.is_revoked {
            if record.is_expired_at(Utc::now()) {
                return Ok(0);
            }
            tracing::warn!(
                user_id = %record.user_id,
                family = %record.token_family,
                token_id = %record.id,
                "Revoked refresh token presented for logout"
            );
            return self.detector.contain(record.token_family, record.user_id).await;
        }

        let revoked = self
            .detector
            .revoke_family(record.token_family, record.user_id, REASON_LOGOUT)
            .await?;

        tracing::info!(
            user_id = %record.user_id,
            family = %record.token_family,
            revoked = revoked,
            "Session logged out"
        );
        Ok(revoked)
    }

    /// End every session of `user_id`.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<usize, AppError> {
        let mut revoked = 0;
        for family in self.store.find_open_families(user_id).await? {
            revoked += self
                .detector
                .revoke_family(family, user_id, REASON_LOGOUT)
                .await?;
        }

        tracing::info!(user_id = %user_id, revoked = revoked, "All sessions logged out");
        Ok(revoked)
    }
}

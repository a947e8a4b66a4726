use chrono::{Duration, Utc};
use std::sync::Arc;

use super::generator::{hash_token, TokenGenerator};
use super::record::RefreshTokenRecord;
use super::store::TokenRecordStore;
use super::TokenPair;
use crate::auth::AccessTokenIssuer;
use crate::error::AppError;
use crate::users::UserAccount;

/// Starts a new token family for a freshly authenticated user.
#[derive(Clone)]
pub struct IssuanceEntry {
    store: Arc<dyn TokenRecordStore>,
    issuer: Arc<dyn AccessTokenIssuer>,
    generator: Arc<dyn TokenGenerator>,
    refresh_lifetime: Duration,
}

impl IssuanceEntry {
    pub fn new(
        store: Arc<dyn TokenRecordStore>,
        issuer: Arc<dyn AccessTokenIssuer>,
        generator: Arc<dyn TokenGenerator>,
        refresh_lifetime: Duration,
    ) -> Self {
        Self {
            store,
            issuer,
            generator,
            refresh_lifetime,
        }
    }

    /// Create the origin record of a new family and sign an access token.
    ///
    /// The caller has already verified the user's credentials.
    pub async fn issue(&self, user: &UserAccount) -> Result<TokenPair, AppError> {
        let refresh_token = self.generator.generate();
        let record = RefreshTokenRecord::origin(
            user.id,
            hash_token(&refresh_token),
            self.refresh_lifetime,
            Utc::now(),
        );
        self.store.insert(&record).await?;

        let access = self.issuer.issue(user.id, &user.email, &user.roles)?;

        tracing::info!(
            user_id = %user.id,
            family = %record.token_family,
            "Token family issued"
        );

        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            expires_in: access.expires_in,
        })
    }
}

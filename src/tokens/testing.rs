use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::generator::{hash_token, TokenGenerator};
use super::memory::InMemoryTokenStore;
use super::record::RefreshTokenRecord;
use super::service::TokenService;
use super::store::TokenRecordStore;
use crate::auth::JwtIssuer;
use crate::configuration::JwtSettings;
use crate::users::{InMemoryUserDirectory, UserAccount, UserDirectory};

/// Deterministic refresh strings: `test-refresh-0001`, `test-refresh-0002`, ...
#[derive(Default)]
pub(crate) struct SequenceTokenGenerator {
    next: AtomicU64,
}

impl TokenGenerator for SequenceTokenGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("test-refresh-{:04}", n)
    }
}

pub(crate) fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "campus_share-test".to_string(),
    }
}

/// A token service over in-memory collaborators with one registered student.
pub(crate) struct Fixture {
    pub store: Arc<InMemoryTokenStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub jwt: JwtSettings,
    pub user: UserAccount,
    pub service: TokenService,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryTokenStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let jwt = jwt_settings();

        let user_id = users.add_user("student@campus.edu", "unused-hash", &["student"]).await;
        let user = users
            .find_active(user_id)
            .await
            .expect("in-memory lookup")
            .expect("user was just added");

        let service = TokenService::new(
            store.clone(),
            users.clone(),
            Arc::new(JwtIssuer::new(jwt.clone())),
            Arc::new(SequenceTokenGenerator::default()),
            jwt.refresh_lifetime(),
        );

        Self {
            store,
            users,
            jwt,
            user,
            service,
        }
    }

    /// Stored record for a bearer string handed out by the service.
    pub async fn record_for(&self, refresh_token: &str) -> RefreshTokenRecord {
        self.store
            .find_by_token_hash(&hash_token(refresh_token))
            .await
            .expect("in-memory lookup")
            .expect("token was issued")
    }
}

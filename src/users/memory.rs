use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{UserAccount, UserCredentials, UserDirectory};
use crate::error::AppError;

#[derive(Debug, Clone)]
struct StoredUser {
    account: UserAccount,
    password_hash: String,
    is_active: bool,
}

/// Process-local `UserDirectory`, used by the test-suite.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, StoredUser>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active user and return its id.
    pub async fn add_user(&self, email: &str, password_hash: &str, roles: &[&str]) -> Uuid {
        let id = Uuid::new_v4();
        let account = UserAccount {
            id,
            email: email.to_lowercase(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };
        self.users.write().await.insert(
            id,
            StoredUser {
                account,
                password_hash: password_hash.to_string(),
                is_active: true,
            },
        );
        id
    }

    pub async fn set_roles(&self, user_id: Uuid, roles: &[&str]) {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.account.roles = roles.iter().map(|r| r.to_string()).collect();
        }
    }

    pub async fn deactivate(&self, user_id: Uuid) {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.is_active = false;
        }
    }

    pub async fn remove(&self, user_id: Uuid) {
        self.users.write().await.remove(&user_id);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.account.email == email)
            .map(|user| UserCredentials {
                id: user.account.id,
                password_hash: user.password_hash.clone(),
                is_active: user.is_active,
            }))
    }

    async fn find_active(&self, user_id: Uuid) -> Result<Option<UserAccount>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .get(&user_id)
            .filter(|user| user.is_active)
            .map(|user| user.account.clone()))
    }
}

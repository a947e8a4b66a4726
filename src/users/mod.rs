/// User directory
///
/// Read-only view of accounts used by login and refresh. Account management
/// (registration, role assignment, deletion) lives outside this service.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;

pub use memory::InMemoryUserDirectory;
pub use postgres::PgUserDirectory;

/// An active user with the roles it currently holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

/// What the login handler needs to check a password
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: String,
    pub is_active: bool,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up login credentials by normalized email.
    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError>;

    /// Resolve an active user and its current roles. Inactive or deleted
    /// users resolve to `None`.
    async fn find_active(&self, user_id: Uuid) -> Result<Option<UserAccount>, AppError>;
}

use uuid::Uuid;

use crate::error::AppError;

/// A signed access token together with its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_in: i64,
}

/// Mints short-lived access tokens for a user and the roles they hold.
///
/// The session core only depends on this seam; `JwtIssuer` is the
/// implementation wired in by `startup`.
pub trait AccessTokenIssuer: Send + Sync {
    fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        roles: &[String],
    ) -> Result<IssuedAccessToken, AppError>;
}

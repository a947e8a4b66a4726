/// JWT Claims structure
///
/// Represents the payload of an access token: the user, the roles held at
/// issuance, and standard JWT claims (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// User email
    pub email: String,
    /// Roles at the time of issuance
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        email: String,
        roles: Vec<String>,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            roles,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract user ID from claims
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

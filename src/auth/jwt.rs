/// JWT Token Generation and Validation
///
/// HS256 access tokens signed with the configured secret.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::issuer::{AccessTokenIssuer, IssuedAccessToken};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Generate a new access token for a user
///
/// # Errors
/// Returns error if token generation fails
pub fn generate_access_token(
    user_id: &Uuid,
    email: &str,
    roles: &[String],
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(
        *user_id,
        email.to_string(),
        roles.to_vec(),
        config.access_token_expiry,
        config.issuer.clone(),
    );

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate and extract claims from an access token
///
/// # Errors
/// `TokenExpired` for a stale token, `TokenInvalid` for anything else
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Auth(AuthError::TokenExpired),
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    })
}

/// `AccessTokenIssuer` backed by HS256 JWTs
#[derive(Clone)]
pub struct JwtIssuer {
    config: JwtSettings,
}

impl JwtIssuer {
    pub fn new(config: JwtSettings) -> Self {
        Self { config }
    }
}

impl AccessTokenIssuer for JwtIssuer {
    fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        roles: &[String],
    ) -> Result<IssuedAccessToken, AppError> {
        let token = generate_access_token(&user_id, email, roles, &self.config)?;
        Ok(IssuedAccessToken {
            token,
            expires_in: self.config.access_token_expiry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    fn roles() -> Vec<String> {
        vec!["student".to_string(), "moderator".to_string()]
    }

    #[test]
    fn test_generate_and_validate_token() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = generate_access_token(&user_id, "student@campus.edu", &roles(), &config)
            .expect("Failed to generate token");
        let claims = validate_access_token(&token, &config).expect("Failed to validate token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "student@campus.edu");
        assert_eq!(claims.roles, roles());
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_issuer_reports_lifetime() {
        let issuer = JwtIssuer::new(get_test_config());
        let issued = issuer
            .issue(Uuid::new_v4(), "student@campus.edu", &roles())
            .expect("Failed to issue token");

        assert_eq!(issued.expires_in, 3600);
        assert!(validate_access_token(&issued.token, &get_test_config()).is_ok());
    }

    #[test]
    fn test_invalid_token() {
        let config = get_test_config();
        assert!(validate_access_token("invalid.token.here", &config).is_err());
    }

    #[test]
    fn test_tampered_token() {
        let config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), "student@campus.edu", &roles(), &config)
            .expect("Failed to generate token");

        let tampered = format!("{}X", token);
        assert!(validate_access_token(&tampered, &config).is_err());
    }

    #[test]
    fn test_expired_token() {
        let mut config = get_test_config();
        config.access_token_expiry = -3600;
        let token = generate_access_token(&Uuid::new_v4(), "student@campus.edu", &roles(), &config)
            .expect("Failed to generate token");

        match validate_access_token(&token, &config) {
            Err(AppError::Auth(AuthError::TokenExpired)) => (),
            other => panic!("Expected TokenExpired, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_wrong_issuer() {
        let mut config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), "student@campus.edu", &roles(), &config)
            .expect("Failed to generate token");

        config.issuer = "wrong-issuer".to_string();
        assert!(validate_access_token(&token, &config).is_err());
    }
}

/// Session Routes
///
/// Login, token refresh, logout and current user information.

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{verify_password, Claims};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::tokens::{TokenPair, TokenService};
use crate::users::UserDirectory;
use crate::validators::is_valid_email;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "Email", alias = "email")]
    pub email: String,
    #[serde(rename = "Password", alias = "password")]
    pub password: String,
}

/// Body of refresh and logout requests
#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "RefreshToken", alias = "refreshToken", alias = "refresh_token")]
    pub refresh_token: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<TokenPair> for AuthResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
        }
    }
}

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub roles: Vec<String>,
}

/// POST /login
///
/// Authenticate user with email and password and start a new token family.
///
/// # Errors
/// - 401: Invalid credentials (malformed email, unknown email, wrong password,
///   inactive account all look the same)
/// - 500/503: Storage failure
pub async fn login(
    form: web::Json<LoginRequest>,
    users: web::Data<dyn UserDirectory>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let email = is_valid_email(&form.email).map_err(|e| {
        tracing::debug!(request_id = %context.request_id, error = %e, "Malformed login email");
        AppError::Auth(AuthError::InvalidCredentials)
    })?;

    let credentials = users
        .find_credentials(&email)
        .await?
        .filter(|c| c.is_active)
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    if !verify_password(&form.password, &credentials.password_hash) {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let user = users
        .find_active(credentials.id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let pair = tokens.issue(&user).await?;

    let context = context.with_user_id(user.id.to_string());
    tracing::info!(
        request_id = %context.request_id,
        user_id = ?context.user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse::from(pair)))
}

/// JSON extractor error handler for `/refresh`.
///
/// A body without a usable `RefreshToken` gets the same 401 as any other
/// rejected refresh token.
pub fn refresh_payload_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "Unreadable refresh request body");
    AppError::Auth(AuthError::TokenInvalid).into()
}

/// POST /refresh
///
/// Exchange a refresh token for a new access/refresh pair. The presented
/// token is retired; presenting it again revokes the whole token family.
///
/// # Errors
/// - 401: Any rejection (unknown, expired, reused, owner gone), same body
/// - 500/503: Storage failure
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let pair = tokens.refresh(&form.refresh_token).await?;

    tracing::info!(request_id = %context.request_id, "Token refreshed successfully");

    Ok(HttpResponse::Ok().json(AuthResponse::from(pair)))
}

/// POST /logout
///
/// Revoke the token family of the presented refresh token. Always 204.
pub async fn logout(
    form: web::Json<RefreshRequest>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    tokens.logout(&form.refresh_token).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/logout-all
///
/// **Requires valid JWT access token.** Revokes every session of the caller.
pub async fn logout_all(
    claims: web::ReqData<Claims>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    tokens.logout_all(user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// **Requires valid JWT access token.** Returns the caller with current roles.
///
/// # Errors
/// - 401: Missing or invalid token, or the account is no longer active
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    users: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = users
        .find_active(user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::TokenInvalid))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id.to_string(),
        email: user.email,
        roles: user.roles,
    }))
}

/// Application Error Handling Module
///
/// This module provides a unified error handling system for the session service.
/// It covers:
/// 1. Domain-Specific Error Types
/// 2. The unified `AppError` used for control flow
/// 3. HTTP Response Mapping (with deliberate collapsing of refresh rejections)
/// 4. Error Context for structured logging

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Why a refresh request was turned away.
///
/// Only ever written to logs. Clients see the same 401 for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRejection {
    /// No record matches the presented string.
    TokenNotFound,
    /// The record's owner no longer resolves to an active user.
    UserMissing,
    /// Past `expires_at`. Benign.
    TokenExpired,
    /// The record was already revoked; the family has been contained.
    TokenReplayed,
}

impl RefreshRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshRejection::TokenNotFound => "token_not_found",
            RefreshRejection::UserMissing => "user_missing",
            RefreshRejection::TokenExpired => "token_expired",
            RefreshRejection::TokenReplayed => "token_replayed",
        }
    }
}

impl fmt::Display for RefreshRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication and authorization errors
#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    MissingToken,
    RefreshRejected(RefreshRejection),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::RefreshRejected(reason) => write!(f, "Refresh rejected: {}", reason),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Database(DatabaseError),
    Auth(AuthError),
    Config(ConfigError),
    Internal(String),
}

impl AppError {
    /// Shorthand used by the rotation engine for its four rejection branches.
    pub fn refresh_rejected(reason: RefreshRejection) -> Self {
        AppError::Auth(AuthError::RefreshRejected(reason))
    }

    /// The rejection tag, if this is a refresh rejection.
    pub fn refresh_rejection(&self) -> Option<RefreshRejection> {
        match self {
            AppError::Auth(AuthError::RefreshRejected(reason)) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS (Control Flow Error Conversion)
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let database_error = match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                DatabaseError::UniqueConstraintViolation(db.message().to_string())
            }
            sqlx::Error::Database(db) => DatabaseError::QueryExecution(db.message().to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionPool(err.to_string())
            }
            _ => DatabaseError::UnexpectedError(err.to_string()),
        };
        AppError::Database(database_error)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY".to_string(),
                    "Duplicate entry".to_string(),
                ),
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE".to_string(),
                    "Database service temporarily unavailable".to_string(),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR".to_string(),
                    "Database error occurred".to_string(),
                ),
            },

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS".to_string(),
                    "Invalid credentials".to_string(),
                ),
                // The rejection tag is dropped here on purpose.
                AuthError::TokenExpired
                | AuthError::TokenInvalid
                | AuthError::RefreshRejected(_) => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED".to_string(),
                    "Invalid or expired token".to_string(),
                ),
                AuthError::MissingToken => (
                    StatusCode::UNAUTHORIZED,
                    "MISSING_TOKEN".to_string(),
                    "Missing authentication token".to_string(),
                ),
            },

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR".to_string(),
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code,
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Auth(AuthError::RefreshRejected(reason)) => {
                tracing::warn!(
                    request_id = request_id,
                    reason = %reason,
                    "Refresh token rejected"
                );
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
                DatabaseError::ConnectionPool(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context attached to log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

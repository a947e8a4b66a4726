/// Password Hashing and Verification
///
/// bcrypt hashes for the login credential check. Strength rules belong to
/// account registration and are not enforced here.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::error!("Password verification failed: {}", e);
            false
        }
    }
}

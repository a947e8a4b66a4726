/// Refresh Token Generation
///
/// Refresh tokens are:
/// - Cryptographically secure random 64-character alphanumeric strings
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Produced through the `TokenGenerator` seam so tests can supply their own

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};

pub const REFRESH_TOKEN_LENGTH: usize = 64;

/// Source of opaque refresh-token strings
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws from the operating system's CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngTokenGenerator;

impl TokenGenerator for OsRngTokenGenerator {
    fn generate(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(REFRESH_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }
}

/// Hash a refresh token using SHA-256
///
/// Lookups always go through the digest of the presented string.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

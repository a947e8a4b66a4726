/// Refresh token sessions
///
/// Login starts a token family (`IssuanceEntry`), refresh rotates within it
/// (`RotationEngine`), and replaying a dead member revokes the whole family
/// (`ReuseDetector`). `TokenService` bundles the three for the HTTP layer.

mod generator;
mod issuance;
mod memory;
mod postgres;
mod record;
mod reuse;
mod rotation;
mod service;
mod store;

#[cfg(test)]
mod testing;

pub use generator::{hash_token, OsRngTokenGenerator, TokenGenerator, REFRESH_TOKEN_LENGTH};
pub use issuance::IssuanceEntry;
pub use memory::InMemoryTokenStore;
pub use postgres::PgTokenStore;
pub use record::{
    RefreshTokenRecord, TokenState, REASON_LOGOUT, REASON_REUSE_DETECTED, REASON_ROTATED,
};
pub use reuse::ReuseDetector;
pub use rotation::RotationEngine;
pub use service::TokenService;
pub use store::{RotationOutcome, TokenRecordStore};

/// Credentials handed back to the client after login or refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token, in seconds.
    pub expires_in: i64,
}

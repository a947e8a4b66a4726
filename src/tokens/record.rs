use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Reason written on a record retired by ordinary rotation.
pub const REASON_ROTATED: &str = "Rotated to new token";
/// Reason written on family members revoked after a dead token was replayed.
pub const REASON_REUSE_DETECTED: &str = "Token reuse detected";
/// Reason written when the user ends a session.
pub const REASON_LOGOUT: &str = "User-initiated logout";

/// One issued refresh token.
///
/// Records reference each other by id only (`parent_token_id`,
/// `replaced_by_token_id`); a lineage is reassembled from the store.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    /// SHA-256 of the bearer string. The bearer string is never stored.
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub reason_revoked: Option<String>,
    pub token_family: Uuid,
    pub parent_token_id: Option<Uuid>,
    pub replaced_by_token_id: Option<Uuid>,
}

/// Lifecycle state of a record at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Live,
    Rotated,
    ReuseRevoked,
    LoggedOut,
    Expired,
}

impl RefreshTokenRecord {
    /// First record of a new family, created at login.
    pub fn origin(user_id: Uuid, token_hash: String, lifetime: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_hash,
            user_id,
            created_at: now,
            expires_at: now + lifetime,
            is_revoked: false,
            revoked_at: None,
            reason_revoked: None,
            token_family: Uuid::new_v4(),
            parent_token_id: None,
            replaced_by_token_id: None,
        }
    }

    /// Successor of `parent` in the same family. Gets its own fresh expiry.
    pub fn child_of(
        parent: &RefreshTokenRecord,
        token_hash: String,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_hash,
            user_id: parent.user_id,
            created_at: now,
            expires_at: now + lifetime,
            is_revoked: false,
            revoked_at: None,
            reason_revoked: None,
            token_family: parent.token_family,
            parent_token_id: Some(parent.id),
            replaced_by_token_id: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && !self.is_expired_at(now)
    }

    pub fn is_origin(&self) -> bool {
        self.parent_token_id.is_none()
    }

    /// Mark revoked. A record that is already revoked keeps its first reason.
    pub fn revoke(&mut self, at: DateTime<Utc>, reason: &str) -> bool {
        if self.is_revoked {
            return false;
        }
        self.is_revoked = true;
        self.revoked_at = Some(at);
        self.reason_revoked = Some(reason.to_string());
        true
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.is_revoked {
            return match self.reason_revoked.as_deref() {
                Some(reason) if reason.contains(REASON_REUSE_DETECTED) => TokenState::ReuseRevoked,
                Some(REASON_LOGOUT) => TokenState::LoggedOut,
                _ => TokenState::Rotated,
            };
        }
        if self.is_expired_at(now) {
            TokenState::Expired
        } else {
            TokenState::Live
        }
    }
}

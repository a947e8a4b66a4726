/// Input validators for the login form
///
/// The email is checked before any database lookup so that garbage input
/// never reaches the user directory.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MIN_EMAIL_LENGTH: usize = 5;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Validates and normalizes an email address
/// - Trims surrounding whitespace and lowercases
/// - Verifies length constraints
/// - Checks format using RFC 5322 simplified regex
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > MAX_LOCAL_PART_LENGTH {
            return true;
        }
    }

    email.matches('@').count() != 1 || email.contains('\0')
}

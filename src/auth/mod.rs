/// Authentication module
///
/// Handles access-token signing/validation behind the `AccessTokenIssuer`
/// seam and password verification for the login credential check.

mod claims;
mod issuer;
mod jwt;
mod password;

pub use claims::Claims;
pub use issuer::{AccessTokenIssuer, IssuedAccessToken};
pub use jwt::{generate_access_token, validate_access_token, JwtIssuer};
pub use password::{hash_password, verify_password};

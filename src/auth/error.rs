//! Authentication errors

use crate::db::GatewayTimeout;
use crate::store::StoreError;

/// Errors raised while authenticating or issuing tokens
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Both cases are reported identically.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing, malformed, expired or reused token
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Password hashing failed")]
    PasswordHash,

    #[error("Token encoding failed: {0}")]
    TokenEncoding(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Timeout(#[from] GatewayTimeout),
}

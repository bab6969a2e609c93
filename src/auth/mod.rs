//! Authentication module
//!
//! - [`password`] - argon2 hashing and verification
//! - [`token`] - HS256 access tokens
//! - [`cache`] - bounded refresh-token cache
//! - [`service`] - login, validation and rotation

pub mod cache;
mod error;
pub mod password;
pub mod service;
pub mod token;

pub use cache::{RefreshTokenRecord, TokenCache};
pub use error::AuthError;
pub use service::{AuthService, TokenPair};
pub use token::{Claims, TokenSigner};

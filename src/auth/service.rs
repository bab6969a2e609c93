//! Auth service
//!
//! Login, access-token validation and single-use refresh-token rotation.

use chrono::Utc;
use rand::RngCore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::cache::{RefreshTokenRecord, TokenCache};
use super::password::{hash_password, verify_password_async};
use super::token::TokenSigner;
use super::AuthError;
use crate::config::Config;
use crate::db::bounded;
use crate::domain::{normalize_email, User};
use crate::store::UserStore;

/// Length of a refresh token before hex encoding
const REFRESH_TOKEN_BYTES: usize = 32;

/// Access and refresh token returned to a client
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    signer: TokenSigner,
    cache: TokenCache,
    refresh_ttl: Duration,
    db_timeout: Duration,
    /// Verified against when the email is unknown, so both login failure
    /// paths cost one argon2 verification.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, config: &Config) -> Result<Self, AuthError> {
        Ok(Self {
            users,
            signer: TokenSigner::new(config.jwt_secret.as_bytes(), config.access_token_ttl),
            cache: TokenCache::new(config.token_cache_capacity_bytes, config.refresh_token_ttl),
            refresh_ttl: config.refresh_token_ttl,
            db_timeout: config.db_timeout,
            dummy_hash: hash_password(&Uuid::new_v4().to_string())?,
        })
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Authenticate by email and password and issue a token pair.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`
    /// after the same amount of hashing work.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        let email = normalize_email(email);
        let user = bounded(self.db_timeout, self.users.find_by_email(&email)).await??;

        let (hash, user) = match user {
            Some(user) => (user.password_hash.clone(), Some(user)),
            None => (self.dummy_hash.clone(), None),
        };

        let matches = verify_password_async(password.to_string(), hash).await?;

        match user {
            Some(user) if matches => {
                tracing::info!(user_id = %user.id, "login succeeded");
                let tokens = self.issue(user.id).await?;
                Ok((user, tokens))
            }
            _ => {
                tracing::info!("login rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Issue a fresh access token and store a companion refresh token
    pub async fn issue(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let access = self.signer.issue(user_id)?;

        let refresh_token = generate_refresh_token();
        let issued_at = Utc::now();
        let record = RefreshTokenRecord {
            user_id,
            issued_at,
            expires_at: issued_at + chrono::Duration::seconds(self.refresh_ttl.as_secs() as i64),
        };
        self.cache.put(&refresh_token, record).await;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.signer.ttl().as_secs(),
        })
    }

    /// Verify an access token and return the user id it was issued for
    pub fn validate_access_token(&self, token: &str) -> Result<Uuid, AuthError> {
        self.signer.user_id(token)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The presented token is consumed whether or not rotation succeeds.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let Some(record) = self.cache.take(refresh_token).await else {
            tracing::debug!("refresh token unknown or already used");
            return Err(AuthError::Unauthorized);
        };

        if record.is_expired() {
            tracing::debug!(user_id = %record.user_id, "refresh token expired");
            return Err(AuthError::Unauthorized);
        }

        let user = bounded(self.db_timeout, self.users.find_by_id(record.user_id)).await??;
        if user.is_none() {
            tracing::debug!(user_id = %record.user_id, "refresh token owner no longer exists");
            return Err(AuthError::Unauthorized);
        }

        tracing::debug!(user_id = %record.user_id, "refresh token rotated");
        self.issue(record.user_id).await
    }

    /// Invalidate a refresh token. Unknown tokens are ignored.
    pub async fn revoke(&self, refresh_token: &str) {
        self.cache.revoke(refresh_token).await;
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("signer", &self.signer)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

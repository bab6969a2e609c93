//! Refresh token cache
//!
//! Bounded in-memory store of live refresh tokens. Entries are keyed by the
//! SHA-256 of the token so the raw value never sits in memory after issue.
//! The cache is weighed in bytes and evicts least recently used entries once
//! the budget is reached; an evicted token simply stops working.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

/// What a live refresh token resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Clone)]
pub struct TokenCache {
    entries: Cache<String, RefreshTokenRecord>,
}

impl TokenCache {
    /// Create a cache holding at most `capacity_bytes` of entries, each
    /// living no longer than `ttl`.
    pub fn new(capacity_bytes: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity_bytes)
            .weigher(|key: &String, _value: &RefreshTokenRecord| -> u32 {
                let weight = key.len() + std::mem::size_of::<RefreshTokenRecord>();
                u32::try_from(weight).unwrap_or(u32::MAX)
            })
            .eviction_policy(EvictionPolicy::lru())
            .time_to_live(ttl)
            .build();

        Self { entries }
    }

    pub async fn put(&self, token: &str, record: RefreshTokenRecord) {
        self.entries.insert(cache_key(token), record).await;
    }

    /// Look up a token without consuming it
    pub async fn get(&self, token: &str) -> Option<RefreshTokenRecord> {
        self.entries.get(&cache_key(token)).await
    }

    /// Remove and return a token's record.
    ///
    /// Removal is atomic: of several concurrent callers presenting the same
    /// token, at most one receives `Some`.
    pub async fn take(&self, token: &str) -> Option<RefreshTokenRecord> {
        self.entries.remove(&cache_key(token)).await
    }

    pub async fn revoke(&self, token: &str) {
        self.entries.invalidate(&cache_key(token)).await;
    }

    /// Approximate number of live entries
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

fn cache_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(ttl_secs: i64) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            user_id: Uuid::new_v4(),
            issued_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_secs),
        }
    }

    #[tokio::test]
    async fn test_put_get_take() {
        let cache = TokenCache::new(1024 * 1024, Duration::from_secs(60));
        let rec = record(60);

        cache.put("token-a", rec.clone()).await;
        assert_eq!(cache.get("token-a").await, Some(rec.clone()));

        assert_eq!(cache.take("token-a").await, Some(rec));
        assert_eq!(cache.take("token-a").await, None);
        assert_eq!(cache.get("token-a").await, None);
    }

    #[tokio::test]
    async fn test_revoke() {
        let cache = TokenCache::new(1024 * 1024, Duration::from_secs(60));
        cache.put("token-b", record(60)).await;

        cache.revoke("token-b").await;
        assert!(cache.get("token-b").await.is_none());
    }

    #[tokio::test]
    async fn test_keys_are_hashed() {
        assert_eq!(cache_key("abc").len(), 64);
        assert_ne!(cache_key("abc"), "abc");
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        // Room for a handful of entries only
        let per_entry = 64 + std::mem::size_of::<RefreshTokenRecord>() as u64;
        let cache = TokenCache::new(per_entry * 4, Duration::from_secs(60));

        for i in 0..64 {
            cache.put(&format!("token-{i}"), record(60)).await;
        }

        assert!(cache.len().await <= 4);
    }

    #[test]
    fn test_record_expiry() {
        assert!(record(-1).is_expired());
        assert!(!record(60).is_expired());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_take_yields_single_winner() {
        let cache = Arc::new(TokenCache::new(1024 * 1024, Duration::from_secs(60)));
        cache.put("contested", record(60)).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.take("contested").await.is_some() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}

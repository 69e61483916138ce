//! Revoked-token lists backing logout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_core::ports::{AuthError, RevocationList};

/// Process-local revocation list. Entries drop out once their token would
/// have expired, so the map only holds tokens that are still live.
///
/// Revocations are lost on restart and not shared between instances; use
/// the Redis list when running more than one server.
#[derive(Default)]
pub struct InMemoryRevocationList {
    revoked: RwLock<HashMap<String, Instant>>,
}

impl InMemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked (unexpired) revocations.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.revoked
            .read()
            .await
            .values()
            .filter(|until| **until > now)
            .count()
    }
}

#[async_trait]
impl RevocationList for InMemoryRevocationList {
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), AuthError> {
        let now = Instant::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, until| *until > now);
        if !ttl.is_zero() {
            revoked.insert(token_id.to_string(), now + ttl);
        }
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, AuthError> {
        let revoked = self.revoked.read().await;
        Ok(revoked
            .get(token_id)
            .is_some_and(|until| *until > Instant::now()))
    }
}

#[cfg(feature = "redis")]
pub use self::redis_list::RedisRevocationList;

#[cfg(feature = "redis")]
mod redis_list {
    use std::time::Duration;

    use async_trait::async_trait;
    use redis::AsyncCommands;
    use redis::aio::ConnectionManager;

    use quill_core::ports::{AuthError, RevocationList};

    use crate::redis_conn::RedisConfig;

    /// Revocation list shared by every server instance through Redis.
    /// Each revoked token is a key that expires with the token.
    pub struct RedisRevocationList {
        conn: ConnectionManager,
        prefix: String,
    }

    impl RedisRevocationList {
        pub async fn connect(config: &RedisConfig) -> Result<Self, AuthError> {
            let conn = config.connect().await.map_err(AuthError::Store)?;
            tracing::info!(url = %config.url, "Connected to Redis revocation list");
            Ok(Self {
                conn,
                prefix: "revoked_token".to_string(),
            })
        }

        fn key(&self, token_id: &str) -> String {
            format!("{}:{}", self.prefix, token_id)
        }
    }

    #[async_trait]
    impl RevocationList for RedisRevocationList {
        async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), AuthError> {
            if ttl.is_zero() {
                return Ok(());
            }
            let mut conn = self.conn.clone();
            conn.set_ex::<_, _, ()>(self.key(token_id), 1u8, ttl.as_secs().max(1))
                .await
                .map_err(|e| AuthError::Store(e.to_string()))
        }

        async fn is_revoked(&self, token_id: &str) -> Result<bool, AuthError> {
            let mut conn = self.conn.clone();
            conn.exists::<_, bool>(self.key(token_id))
                .await
                .map_err(|e| AuthError::Store(e.to_string()))
        }
    }
}

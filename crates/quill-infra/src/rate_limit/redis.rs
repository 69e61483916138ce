//! Redis fixed-window rate limiter shared by every server instance.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use quill_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

use super::RateLimitConfig;
use crate::redis_conn::RedisConfig;

/// Counts requests per key in windows aligned to the unix epoch. Each
/// window has its own counter key, which expires together with the window.
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    config: RateLimitConfig,
    key_prefix: String,
}

impl RedisRateLimiter {
    pub async fn connect(
        redis: &RedisConfig,
        config: RateLimitConfig,
    ) -> Result<Self, RateLimitError> {
        if config.max_requests == 0 || config.window.as_secs() == 0 {
            return Err(RateLimitError::Config(
                "max_requests and window must be positive".into(),
            ));
        }
        let conn = redis.connect().await.map_err(RateLimitError::Backend)?;
        tracing::info!(url = %redis.url, "Connected to Redis rate limiter");

        Ok(Self {
            conn,
            config,
            key_prefix: "ratelimit".to_string(),
        })
    }
}

/// Counter key and time left for the window containing `now_secs`.
fn window_for(prefix: &str, window_secs: u64, key: &str, now_secs: u64) -> (String, Duration) {
    let index = now_secs / window_secs;
    let left = window_secs - now_secs % window_secs;
    (
        format!("{prefix}:{key}:{index}"),
        Duration::from_secs(left),
    )
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| RateLimitError::Backend(e.to_string()))?
            .as_secs();
        let (counter, reset_after) =
            window_for(&self.key_prefix, self.config.window.as_secs(), key, now);
        let mut conn = self.conn.clone();

        let (count,): (u32,) = redis::pipe()
            .atomic()
            .incr(&counter, 1)
            .expire(&counter, reset_after.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        let allowed = count <= self.config.max_requests;
        Ok(RateLimitResult {
            allowed,
            remaining: self.config.max_requests.saturating_sub(count),
            reset_after: if allowed { Duration::ZERO } else { reset_after },
        })
    }
}

//! Entity and page cache in Redis, shared by every server instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use shoplist_core::cache::{Cache, Result};

use super::error::map_redis_error;

/// Cache entries live as raw bytes under the same keys the in-process cache
/// uses. TTLs are sent in milliseconds.
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connects to `url`. Fails with `CacheError::Unavailable` when the
    /// server cannot be reached at startup; later drops are retried by the
    /// connection manager.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

/// Zero-length TTLs still expire; Redis rejects a `PX` of 0.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.conn().get(key).await.map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn();
        let stored: redis::RedisResult<()> = match ttl {
            Some(ttl) => conn.pset_ex(key, value, ttl_millis(ttl)).await,
            None => conn.set(key, value).await,
        };
        stored.map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.conn()
            .del::<_, ()>(key)
            .await
            .map_err(map_redis_error)
    }
}

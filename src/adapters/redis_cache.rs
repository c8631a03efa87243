use crate::domain::ports::{Cache, CacheError, CacheResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError(err.to_string())
    }
}

/// Redis-backed cache. The connection manager reconnects on its own, so a
/// Redis outage only shows up as per-call errors.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("🔌 Connected to Redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            let _: () = conn.set(key, value).await?;
        } else {
            // Redis expiry granularity is one second
            let seconds = ttl.as_secs().max(1);
            let _: () = conn.set_ex(key, value, seconds).await?;
        }
        Ok(())
    }
}

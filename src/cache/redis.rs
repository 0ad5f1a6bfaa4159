//! Redis cache over a `deadpool-redis` connection pool.

use super::{AppCache, record};
use crate::config::RedisConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use deadpool_redis::{Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

/// PTTL reply for a key that does not exist.
const PTTL_MISSING: i64 = -2;

#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the pool. Connections are opened lazily on first use.
    pub fn from_config(config: &RedisConfig) -> Result<Self> {
        let pool = deadpool_redis::Config::from_connection_info(config.connection_info())
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Cache(format!("failed to create redis pool: {e}")))?;
        Ok(Self::new(pool))
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool.get().await.map_err(|e| {
            record("redis", "connect", "error");
            Error::Cache(format!("failed to get redis connection: {e}"))
        })
    }
}

#[async_trait]
impl AppCache for RedisCache {
    /// A zero `ttl` stores the key without expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            conn.set::<_, _, ()>(key, value).await?;
        } else {
            conn.pset_ex::<_, _, ()>(key, value, millis).await?;
        }
        record("redis", "set", "ok");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        let mut conn = self.conn().await?;

        let pttl: i64 = conn.pttl(key).await?;
        if pttl == PTTL_MISSING {
            record("redis", "get", "miss");
            return Err(Error::CacheMiss(key.to_string()));
        }

        // Can still vanish between PTTL and GET.
        match conn.get::<_, Option<String>>(key).await? {
            Some(value) => {
                record("redis", "get", "hit");
                Ok(value)
            }
            None => {
                record("redis", "get", "miss");
                Err(Error::CacheMiss(key.to_string()))
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        Ok(conn.exists(key).await?)
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn().await?;
        let removed: u64 = conn.del(key).await?;
        record("redis", "delete", "ok");
        Ok(removed)
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisCache")
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

//! Key/value caches for short-lived string values.
//!
//! [`MemoryCache`] is process-local; [`RedisCache`] is shared between
//! instances. Both implement [`AppCache`] so callers can pick at startup.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use crate::error::Result;
use crate::telemetry::metrics;
use async_trait::async_trait;
use opentelemetry::KeyValue;
use std::time::Duration;

#[async_trait]
pub trait AppCache: Send + Sync {
    /// Store `value` under `key`. What a zero `ttl` means is backend-specific.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Fetch a live value. Missing or expired keys are [`Error::CacheMiss`](crate::error::Error::CacheMiss).
    async fn get(&self, key: &str) -> Result<String>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remove `key`, returning how many entries were removed (0 or 1).
    async fn delete(&self, key: &str) -> Result<u64>;
}

fn record(backend: &'static str, operation: &'static str, result: &'static str) {
    metrics::cache_operations().add(
        1,
        &[
            KeyValue::new("backend", backend),
            KeyValue::new("operation", operation),
            KeyValue::new("result", result),
        ],
    );
}

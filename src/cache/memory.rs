//! In-process cache backed by `DashMap` with per-entry expiry.

use super::{AppCache, record};
use crate::config::MemoryCacheConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Cheap to clone; clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Entry>>,
    default_expiration: Duration,
}

impl MemoryCache {
    /// `default_expiration` applies when `set` gets a zero TTL. Zero means never expire.
    pub fn new(default_expiration: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_expiration,
        }
    }

    /// Build a cache and, when the interval is non-zero, start its janitor.
    ///
    /// Must be called inside a Tokio runtime if a janitor is started.
    pub fn from_config(config: &MemoryCacheConfig) -> Self {
        let cache = Self::new(config.default_expiration);
        if !config.cleanup_interval.is_zero() {
            cache.spawn_janitor(config.cleanup_interval);
        }
        cache
    }

    /// Periodically purge expired entries. The task ends once every clone
    /// of this cache has been dropped.
    pub fn spawn_janitor(&self, interval: Duration) -> JoinHandle<()> {
        let entries = Arc::downgrade(&self.entries);
        tokio::spawn(janitor(entries, interval))
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Entries currently stored, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl AppCache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = if ttl.is_zero() {
            self.default_expiration
        } else {
            ttl
        };
        // A TTL past the clock's range never expires.
        let expires_at = (!ttl.is_zero())
            .then(|| Instant::now().checked_add(ttl))
            .flatten();

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        record("memory", "set", "ok");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        match self.live_value(key) {
            Some(value) => {
                record("memory", "get", "hit");
                Ok(value)
            }
            None => {
                record("memory", "get", "miss");
                Err(Error::CacheMiss(key.to_string()))
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_value(key).is_some())
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let removed = self.entries.remove(key).is_some();
        record("memory", "delete", "ok");
        Ok(u64::from(removed))
    }
}

async fn janitor(entries: Weak<DashMap<String, Entry>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(entries) = entries.upgrade() else {
            debug!("memory cache dropped, janitor exiting");
            return;
        };
        let purged = purge(&entries);
        if purged > 0 {
            debug!(purged, "purged expired cache entries");
        }
    }
}

fn purge(entries: &DashMap<String, Entry>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(entries.len())
}

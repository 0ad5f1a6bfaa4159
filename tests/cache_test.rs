use pubsub_common::cache::{AppCache, MemoryCache, RedisCache};
use pubsub_common::config::{MemoryCacheConfig, RedisConfig};
use pubsub_common::error::Error;
use std::time::Duration;

#[tokio::test]
async fn memory_set_get_delete() {
    let cache = MemoryCache::new(Duration::from_secs(60));

    cache.set("otp:1", "4242", Duration::from_secs(30)).await.unwrap();
    assert_eq!(cache.get("otp:1").await.unwrap(), "4242");
    assert!(cache.exists("otp:1").await.unwrap());

    assert_eq!(cache.delete("otp:1").await.unwrap(), 1);
    assert_eq!(cache.delete("otp:1").await.unwrap(), 0);
    assert!(!cache.exists("otp:1").await.unwrap());
    assert!(matches!(cache.get("otp:1").await, Err(Error::CacheMiss(k)) if k == "otp:1"));
}

#[tokio::test]
async fn memory_entries_expire() {
    let cache = MemoryCache::new(Duration::ZERO);

    cache.set("short", "v", Duration::from_millis(20)).await.unwrap();
    cache.set("forever", "v", Duration::ZERO).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert!(matches!(cache.get("short").await, Err(Error::CacheMiss(_))));
    assert!(!cache.exists("short").await.unwrap());
    assert_eq!(cache.get("forever").await.unwrap(), "v");

    // expired entries linger until purged
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn memory_zero_ttl_uses_default() {
    let cache = MemoryCache::new(Duration::from_millis(20));

    cache.set("k", "v", Duration::ZERO).await.unwrap();
    assert!(cache.exists("k").await.unwrap());
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(!cache.exists("k").await.unwrap());
}

#[tokio::test]
async fn memory_huge_ttl_never_expires() {
    let cache = MemoryCache::new(Duration::ZERO);

    cache.set("k", "v", Duration::MAX).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), "v");
    assert!(cache.exists("k").await.unwrap());
    assert_eq!(cache.purge_expired(), 0);
}

#[tokio::test]
async fn memory_set_overwrites() {
    let cache = MemoryCache::new(Duration::ZERO);
    cache.set("k", "one", Duration::ZERO).await.unwrap();
    cache.set("k", "two", Duration::ZERO).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), "two");
}

#[tokio::test]
async fn memory_clones_share_entries() {
    let cache = MemoryCache::new(Duration::ZERO);
    let other = cache.clone();
    cache.set("k", "v", Duration::ZERO).await.unwrap();
    assert_eq!(other.get("k").await.unwrap(), "v");
}

#[tokio::test]
async fn janitor_purges_and_exits_with_cache() {
    let cache = MemoryCache::from_config(&MemoryCacheConfig {
        default_expiration: Duration::from_millis(10),
        cleanup_interval: Duration::ZERO,
    });
    let janitor = cache.spawn_janitor(Duration::from_millis(20));

    cache.set("k", "v", Duration::ZERO).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.is_empty());

    drop(cache);
    tokio::time::timeout(Duration::from_secs(2), janitor)
        .await
        .expect("janitor should exit once the cache is dropped")
        .unwrap();
}

#[tokio::test]
async fn memory_cache_as_trait_object() {
    let cache: Box<dyn AppCache> = Box::new(MemoryCache::new(Duration::ZERO));
    cache.set("k", "v", Duration::ZERO).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), "v");
}

fn redis_config() -> RedisConfig {
    RedisConfig {
        host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: 6379,
        password: None,
        db: 0,
    }
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn redis_set_get_delete() {
    let cache = RedisCache::from_config(&redis_config()).unwrap();
    let key = format!("pubsub-test:{}", uuid::Uuid::now_v7());

    cache.set(&key, "v", Duration::from_secs(30)).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), "v");
    assert!(cache.exists(&key).await.unwrap());
    assert_eq!(cache.delete(&key).await.unwrap(), 1);
    assert!(matches!(cache.get(&key).await, Err(Error::CacheMiss(_))));
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn redis_key_without_expiry_is_readable() {
    let cache = RedisCache::from_config(&redis_config()).unwrap();
    let key = format!("pubsub-test:{}", uuid::Uuid::now_v7());

    cache.set(&key, "persistent", Duration::ZERO).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), "persistent");
    cache.delete(&key).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn redis_millisecond_ttl_expires() {
    let cache = RedisCache::from_config(&redis_config()).unwrap();
    let key = format!("pubsub-test:{}", uuid::Uuid::now_v7());

    cache.set(&key, "v", Duration::from_millis(50)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(matches!(cache.get(&key).await, Err(Error::CacheMiss(_))));
}

//! Error types for pubsub-common.

use thiserror::Error;

use crate::subscriber::PoolState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid subscriber transition: {from} -> {to}")]
    InvalidTransition { from: PoolState, to: PoolState },

    #[error("handlers are sealed once the subscriber leaves created (state: {0})")]
    HandlersSealed(PoolState),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("invalid notification: {0}")]
    Validation(String),

    #[error("cache key not found: {0}")]
    CacheMiss(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

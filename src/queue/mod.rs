//! Remote queue access used by the subscriber.
//!
//! [`QueueClient`] is the seam between the worker pool and the provider.
//! Implementations must tolerate concurrent calls from every worker.

pub mod sqs;

pub use sqs::SqsQueue;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Provider maximum for messages returned by one receive call.
pub const MAX_BATCH_SIZE: i32 = 10;
/// Provider maximum for a long-poll wait.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);
/// Visibility timeout applied to received messages unless configured.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Single-use receipt needed to delete (acknowledge) one delivery.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AckToken(String);

impl AckToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AckToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Receipt handles are long opaque blobs; the prefix is enough to correlate.
        let prefix: String = self.0.chars().take(12).collect();
        write!(f, "AckToken({prefix}…)")
    }
}

/// A message received from the queue.
///
/// Deliberately not `Clone`: a delivery belongs to the worker that received
/// it until it is deleted or abandoned.
#[derive(Debug)]
pub struct Message {
    pub id: String,
    pub ack: AckToken,
    pub body: String,
    /// Provider system attributes (sent timestamp, receive count, ...).
    pub attributes: HashMap<String, String>,
    /// Sender-supplied message attributes with a string representation.
    pub metadata: HashMap<String, String>,
}

impl Message {
    pub fn new(id: impl Into<String>, ack: AckToken, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ack,
            body: body.into(),
            attributes: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Parameters for one long-poll receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub max_messages: i32,
    pub wait_time: Duration,
    pub visibility_timeout: Duration,
}

impl Default for ReceiveRequest {
    fn default() -> Self {
        Self {
            max_messages: MAX_BATCH_SIZE,
            wait_time: MAX_WAIT_TIME,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Resolve a queue name into the URL used by the other calls.
    async fn resolve_queue_url(&self, queue_name: &str, account_id: Option<&str>)
    -> Result<String>;

    /// Long-poll for up to `request.max_messages` messages.
    ///
    /// An empty batch is a normal outcome; errors are transient.
    async fn receive_batch(&self, queue_url: &str, request: &ReceiveRequest)
    -> Result<Vec<Message>>;

    /// Acknowledge one delivery. Deleting twice is harmless.
    async fn delete(&self, queue_url: &str, ack: &AckToken) -> Result<()>;
}

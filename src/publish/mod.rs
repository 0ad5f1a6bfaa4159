//! Topic publishing.
//!
//! [`Publisher`] is the seam over the notification service; [`SnsPublisher`]
//! is the production implementation. [`SnsNotification`] and
//! [`ServiceAlert`] build requests on top of it.

pub mod alert;
pub mod notification;
pub mod sns;

pub use alert::{ALERT_TOPIC, ServiceAlert};
pub use notification::{MAX_MESSAGE_SIZE, SnsNotification};
pub use sns::SnsPublisher;

use crate::config::ResourceNaming;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Typed message attribute. Only string-valued attributes are produced here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub data_type: String,
    pub string_value: String,
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: value.into(),
        }
    }
}

/// Attributes keyed by name. Ordered so built requests are deterministic.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// One message to publish to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub topic_arn: String,
    pub message: String,
    pub subject: Option<String>,
    pub attributes: Attributes,
    /// FIFO topics only.
    pub deduplication_id: Option<String>,
    /// FIFO topics only.
    pub group_id: Option<String>,
}

impl PublishRequest {
    pub fn new(topic_arn: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            topic_arn: topic_arn.into(),
            message: message.into(),
            subject: None,
            attributes: Attributes::new(),
            deduplication_id: None,
            group_id: None,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish and return the provider's message id.
    async fn publish(&self, request: PublishRequest) -> Result<String>;

    /// Publish to a logical topic name, resolved through `naming`.
    async fn publish_to_topic(
        &self,
        naming: &ResourceNaming,
        topic: &str,
        message: &str,
        attributes: Attributes,
    ) -> Result<String> {
        let arn = naming.topic_arn(topic)?;
        self.publish(PublishRequest::new(arn, message).with_attributes(attributes))
            .await
    }

    /// Publish to an already-resolved topic ARN.
    async fn publish_to_arn(
        &self,
        topic_arn: &str,
        message: &str,
        attributes: Attributes,
    ) -> Result<String> {
        self.publish(PublishRequest::new(topic_arn, message).with_attributes(attributes))
            .await
    }
}

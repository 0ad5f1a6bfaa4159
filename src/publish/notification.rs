//! Builder for user-facing notifications published to a topic.

use super::{AttributeValue, Attributes, PublishRequest, Publisher};
use crate::config::ResourceNaming;
use crate::error::{Error, Result};
use serde_json::Value;

/// Largest payload a topic accepts, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Notification for downstream consumers, carried as message attributes.
///
/// ```no_run
/// # use pubsub_common::publish::{Publisher, SnsNotification};
/// # use pubsub_common::config::ResourceNaming;
/// # async fn run(publisher: &dyn Publisher, naming: &ResourceNaming) -> pubsub_common::error::Result<()> {
/// SnsNotification::new("user-events", "Your car was listed")
///     .with_type("car_listed")
///     .with_type_id("car-42")
///     .with_recipients(serde_json::json!(["user-1"]))
///     .send(publisher, naming)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnsNotification {
    pub topic: String,
    pub message: String,
    pub subject: Option<String>,
    pub recipients: Option<Value>,
    pub body: Option<Value>,
    pub notification_type: Option<String>,
    pub type_id: Option<String>,
    pub message_group_id: Option<String>,
    pub fifo: bool,
    /// Internal traffic between services; recipients are optional.
    pub service_to_service: bool,
    pub extra_attributes: Attributes,
}

impl SnsNotification {
    pub fn new(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = non_empty(subject.into());
        self
    }

    pub fn with_recipients(mut self, recipients: Value) -> Self {
        self.recipients = Some(recipients);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_type(mut self, notification_type: impl Into<String>) -> Self {
        self.notification_type = non_empty(notification_type.into());
        self
    }

    pub fn with_type_id(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = non_empty(type_id.into());
        self
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.message_group_id = non_empty(group_id.into());
        self
    }

    pub fn fifo(mut self) -> Self {
        self.fifo = true;
        self
    }

    pub fn service_to_service(mut self) -> Self {
        self.service_to_service = true;
        self
    }

    /// Extra attribute; overrides a built-in attribute with the same name.
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.extra_attributes.insert(name.into(), value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::Validation("topic is required".to_string()));
        }
        if self.message.is_empty() {
            return Err(Error::Validation("message is required".to_string()));
        }
        if self.fifo && self.type_id.is_none() && self.message_group_id.is_none() {
            return Err(Error::Validation(
                "FIFO topics require a type id or a message group id".to_string(),
            ));
        }
        if !self.service_to_service && self.recipients.is_none() {
            return Err(Error::Validation(
                "at least one recipient is required".to_string(),
            ));
        }

        let size = self.encoded_size()?;
        if size > MAX_MESSAGE_SIZE {
            return Err(Error::Validation(format!(
                "notification is {size} bytes, over the {MAX_MESSAGE_SIZE} byte limit"
            )));
        }
        Ok(())
    }

    /// Validate and turn into a request for the environment-qualified topic.
    pub fn build(&self, naming: &ResourceNaming) -> Result<PublishRequest> {
        self.validate()?;

        let mut attributes = Attributes::new();
        if let Some(t) = &self.notification_type {
            attributes.insert("type".to_string(), AttributeValue::string(t));
        }
        if let Some(id) = &self.type_id {
            attributes.insert("typeId".to_string(), AttributeValue::string(id));
        }
        if let Some(recipients) = &self.recipients {
            attributes.insert(
                "recipients".to_string(),
                AttributeValue::string(serde_json::to_string(recipients)?),
            );
        }
        if let Some(body) = &self.body {
            attributes.insert(
                "body".to_string(),
                AttributeValue::string(serde_json::to_string(body)?),
            );
        }
        attributes.extend(self.extra_attributes.clone());

        let (deduplication_id, group_id) = if self.fifo {
            (self.type_id.clone(), self.message_group_id.clone())
        } else {
            (None, None)
        };

        Ok(PublishRequest {
            topic_arn: naming.topic_arn(&self.topic)?,
            message: self.message.clone(),
            subject: self.subject.clone(),
            attributes,
            deduplication_id,
            group_id,
        })
    }

    pub async fn send(&self, publisher: &dyn Publisher, naming: &ResourceNaming) -> Result<String> {
        publisher.publish(self.build(naming)?).await
    }

    fn encoded_size(&self) -> Result<usize> {
        let json_len = |value: &Option<Value>| -> Result<usize> {
            Ok(match value {
                Some(v) => serde_json::to_string(v)?.len(),
                None => 0,
            })
        };
        let text_len = |value: &Option<String>| value.as_deref().map_or(0, str::len);

        let extra: usize = self
            .extra_attributes
            .iter()
            .map(|(k, v)| k.len() + v.string_value.len())
            .sum();

        Ok(self.message.len()
            + text_len(&self.subject)
            + text_len(&self.notification_type)
            + text_len(&self.type_id)
            + json_len(&self.body)?
            + json_len(&self.recipients)?
            + extra)
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

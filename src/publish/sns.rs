//! SNS implementation of [`Publisher`] via aws-sdk-sns.

use super::{PublishRequest, Publisher};
use crate::config::AwsConfig;
use crate::error::{Error, Result};
use crate::telemetry::metrics;
use async_trait::async_trait;
use aws_sdk_sns::Client;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::types::MessageAttributeValue;
use opentelemetry::KeyValue;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SnsPublisher {
    client: Client,
}

impl SnsPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_config(aws: &AwsConfig) -> Self {
        Self::new(Client::new(&aws.load_sdk_config().await))
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    async fn publish(&self, request: PublishRequest) -> Result<String> {
        let mut attributes = HashMap::with_capacity(request.attributes.len());
        for (name, value) in request.attributes {
            let value = MessageAttributeValue::builder()
                .data_type(value.data_type)
                .string_value(value.string_value)
                .build()
                .map_err(|e| Error::Publish(format!("attribute {name}: {e}")))?;
            attributes.insert(name, value);
        }

        let result = self
            .client
            .publish()
            .topic_arn(&request.topic_arn)
            .message(request.message)
            .set_subject(request.subject)
            .set_message_attributes((!attributes.is_empty()).then_some(attributes))
            .set_message_deduplication_id(request.deduplication_id)
            .set_message_group_id(request.group_id)
            .send()
            .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::notifications_published().add(1, &[KeyValue::new("result", outcome)]);

        let output = result.map_err(|e| {
            Error::Publish(format!(
                "publish to {}: {}",
                request.topic_arn,
                DisplayErrorContext(&e)
            ))
        })?;

        let message_id = output.message_id().unwrap_or_default().to_string();
        debug!(topic = %request.topic_arn, message_id = %message_id, "published");
        Ok(message_id)
    }
}

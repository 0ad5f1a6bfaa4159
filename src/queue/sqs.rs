//! SQS implementation of [`QueueClient`] via aws-sdk-sqs.

use super::{AckToken, Message, QueueClient, ReceiveRequest};
use crate::config::AwsConfig;
use crate::error::{Error, Result};
use crate::telemetry::metrics;
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use opentelemetry::KeyValue;
use std::time::Duration;
use tracing::warn;

/// SQS-backed queue client. Cheap to share; the SDK client is internally pooled.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
}

impl SqsQueue {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from explicit AWS configuration.
    pub async fn from_config(aws: &AwsConfig) -> Self {
        Self::new(Client::new(&aws.load_sdk_config().await))
    }
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn resolve_queue_url(
        &self,
        queue_name: &str,
        account_id: Option<&str>,
    ) -> Result<String> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(queue_name)
            .set_queue_owner_aws_account_id(account_id.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                Error::Queue(format!(
                    "resolve queue {queue_name}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| Error::Queue(format!("no url returned for queue {queue_name}")))
    }

    async fn receive_batch(
        &self,
        queue_url: &str,
        request: &ReceiveRequest,
    ) -> Result<Vec<Message>> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(request.max_messages)
            .wait_time_seconds(whole_seconds(request.wait_time))
            .visibility_timeout(whole_seconds(request.visibility_timeout))
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| Error::Queue(format!("receive: {}", DisplayErrorContext(&e))))?;

        let messages: Vec<Message> = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(into_message)
            .collect();

        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", queue_label(queue_url)),
                KeyValue::new(
                    "operation",
                    if messages.is_empty() {
                        "receive_empty"
                    } else {
                        "receive"
                    },
                ),
            ],
        );

        Ok(messages)
    }

    async fn delete(&self, queue_url: &str, ack: &AckToken) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(ack.as_str())
            .send()
            .await
            .map_err(|e| Error::Queue(format!("delete: {}", DisplayErrorContext(&e))))?;

        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", queue_label(queue_url)),
                KeyValue::new("operation", "delete"),
            ],
        );
        Ok(())
    }
}

fn into_message(raw: aws_sdk_sqs::types::Message) -> Option<Message> {
    let Some(receipt) = raw.receipt_handle else {
        warn!(message_id = ?raw.message_id, "received message without receipt handle, skipping");
        return None;
    };

    let attributes = raw
        .attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();

    let metadata = raw
        .message_attributes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.string_value().map(|v| (name, v.to_string())))
        .collect();

    Some(Message {
        id: raw.message_id.unwrap_or_default(),
        ack: AckToken::new(receipt),
        body: raw.body.unwrap_or_default(),
        attributes,
        metadata,
    })
}

fn whole_seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

/// Queue name from its URL, for low-cardinality metric labels.
fn queue_label(queue_url: &str) -> String {
    queue_url
        .rsplit('/')
        .next()
        .unwrap_or(queue_url)
        .to_string()
}

//! Operational alerts sent to the shared alerts topic.

use super::{AttributeValue, Attributes, Publisher};
use crate::config::ResourceNaming;
use crate::error::Result;
use serde_json::Value;

pub const ALERT_TOPIC: &str = "services-alerts";
const ALERT_MESSAGE: &str = "Service alert";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceAlert {
    pub service: String,
    pub title: String,
    pub detail: String,
    pub fallback_detail: String,
    pub data: Option<Value>,
    pub car_id: Option<String>,
    pub user_id: Option<String>,
}

impl ServiceAlert {
    pub fn attributes(&self) -> Result<Attributes> {
        let data = match &self.data {
            Some(v) => serde_json::to_string(v)?,
            None => String::new(),
        };

        let mut attributes = Attributes::from([
            ("Service".to_string(), AttributeValue::string(&self.service)),
            ("Detail".to_string(), AttributeValue::string(&self.detail)),
            ("Title".to_string(), AttributeValue::string(&self.title)),
            (
                "FallbackDetail".to_string(),
                AttributeValue::string(&self.fallback_detail),
            ),
            ("Data".to_string(), AttributeValue::string(data)),
        ]);

        if let Some(id) = self.car_id.as_deref().filter(|s| !s.is_empty()) {
            attributes.insert("CarID".to_string(), AttributeValue::string(id));
        }
        if let Some(id) = self.user_id.as_deref().filter(|s| !s.is_empty()) {
            attributes.insert("UserID".to_string(), AttributeValue::string(id));
        }
        Ok(attributes)
    }

    pub async fn send(&self, publisher: &dyn Publisher, naming: &ResourceNaming) -> Result<String> {
        publisher
            .publish_to_topic(naming, ALERT_TOPIC, ALERT_MESSAGE, self.attributes()?)
            .await
    }
}

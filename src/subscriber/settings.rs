//! Optional TOML overrides for [`SubscriberConfig`].
//!
//! ```toml
//! worker_count = 8
//! batch_size = 5
//! wait_time_secs = 10
//! visibility_timeout_secs = 60
//! receive_backoff_ms = 500
//! ```

use super::SubscriberConfig;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriberSettings {
    pub worker_count: Option<usize>,
    pub batch_size: Option<i32>,
    pub wait_time_secs: Option<u64>,
    pub visibility_timeout_secs: Option<u64>,
    pub receive_backoff_ms: Option<u64>,
}

impl SubscriberSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
            .map_err(|e| Error::Config(format!("invalid settings file {}: {e}", path.display())))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Overlay the fields present in the file onto `base`.
    pub fn apply(&self, base: SubscriberConfig) -> SubscriberConfig {
        let mut config = base;
        if let Some(n) = self.worker_count {
            config.worker_count = n;
        }
        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        if let Some(s) = self.wait_time_secs {
            config.wait_time = Duration::from_secs(s);
        }
        if let Some(s) = self.visibility_timeout_secs {
            config.visibility_timeout = Duration::from_secs(s);
        }
        if let Some(ms) = self.receive_backoff_ms {
            config.receive_backoff = Duration::from_millis(ms);
        }
        config
    }
}

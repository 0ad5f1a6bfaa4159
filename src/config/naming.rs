//! Environment-aware names for queues and topics.
//!
//! Non-production environments share an AWS account with production, so
//! every queue and topic name is prefixed with the environment name there.

use crate::error::{Error, Result};
use std::fmt;

/// Deployment environment (the value of `APP_ENV`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment(String);

impl Environment {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::Config("environment name is empty".to_string()));
        }
        Ok(Self(name))
    }

    pub fn is_production(&self) -> bool {
        matches!(self.0.as_str(), "prod" | "production")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves logical resource names into the names that exist in AWS.
///
/// Built once from configuration and passed explicitly; nothing here reads
/// the process environment.
#[derive(Debug, Clone)]
pub struct ResourceNaming {
    environment: Environment,
    region: String,
    account_id: Option<String>,
}

impl ResourceNaming {
    pub fn new(
        environment: Environment,
        region: impl Into<String>,
        account_id: Option<String>,
    ) -> Self {
        Self {
            environment,
            region: region.into(),
            account_id,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// `name` in production, `<env>_<name>` everywhere else.
    pub fn qualify(&self, name: &str) -> String {
        if self.environment.is_production() {
            name.to_string()
        } else {
            format!("{}_{name}", self.environment)
        }
    }

    pub fn queue_name(&self, name: &str) -> String {
        self.qualify(name)
    }

    /// Full SNS topic ARN for a logical topic name.
    pub fn topic_arn(&self, topic: &str) -> Result<String> {
        let account = self.account_id.as_deref().ok_or_else(|| {
            Error::Config(format!("cannot build ARN for topic {topic}: no account id"))
        })?;
        Ok(format!(
            "arn:aws:sns:{}:{account}:{}",
            self.region,
            self.qualify(topic)
        ))
    }
}

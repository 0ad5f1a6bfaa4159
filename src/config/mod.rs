//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod naming;
pub mod secrets;

pub use naming::{Environment, ResourceNaming};

use crate::error::{Error, Result};
use deadpool_redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub environment: Environment,
    pub app_name: String,
    pub aws: AwsConfig,
    pub database_url: Option<SecretString>,
    pub redis: Option<RedisConfig>,
    pub memory_cache: MemoryCacheConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// AWS account, region and optional static credentials.
#[derive(Debug)]
pub struct AwsConfig {
    pub region: String,
    pub account_id: String,
    pub access_key: Option<SecretString>,
    pub secret_key: Option<SecretString>,
}

#[derive(Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<SecretString>,
    pub db: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCacheConfig {
    /// Expiry applied when `set` is called with a zero TTL. Zero means never.
    pub default_expiration: Duration,
    /// How often the janitor sweeps expired entries.
    pub cleanup_interval: Duration,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            default_expiration: Duration::from_secs(5 * 60),
            cleanup_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| {
                Error::Config(format!("required environment variable {name} is not set"))
            })
        };

        let access_key = var("AWS_ACCESS_KEY").map(SecretString::from);
        let secret_key = var("AWS_SECRET").map(SecretString::from);
        if access_key.is_some() != secret_key.is_some() {
            return Err(Error::Config(
                "AWS_ACCESS_KEY and AWS_SECRET must be set together".to_string(),
            ));
        }

        let redis = match var("REDIS_HOST") {
            Some(host) => Some(RedisConfig {
                host,
                port: parse_or(var("REDIS_PORT"), "REDIS_PORT", 6379)?,
                password: var("REDIS_PASSWORD").map(SecretString::from),
                db: parse_or(var("REDIS_DB"), "REDIS_DB", 0)?,
            }),
            None => None,
        };

        let defaults = MemoryCacheConfig::default();
        let memory_cache = MemoryCacheConfig {
            default_expiration: minutes_or(
                var("IN_MEM_DEFAULT_EXP"),
                "IN_MEM_DEFAULT_EXP",
                defaults.default_expiration,
            )?,
            cleanup_interval: minutes_or(
                var("IN_MEM_CLEANUP_INTERVAL"),
                "IN_MEM_CLEANUP_INTERVAL",
                defaults.cleanup_interval,
            )?,
        };

        Ok(Self {
            environment: Environment::new(required("APP_ENV")?)?,
            app_name: var("APP_NAME").unwrap_or_else(|| "service".to_string()),
            aws: AwsConfig {
                region: required("AWS_REGION")?,
                account_id: required("AWS_ACCOUNT_ID")?,
                access_key,
                secret_key,
            },
            database_url: var("DATABASE_URL").map(SecretString::from),
            redis,
            memory_cache,
            otel_endpoint: var("OTEL_ENDPOINT"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Naming rule for queues and topics derived from this configuration.
    pub fn naming(&self) -> ResourceNaming {
        ResourceNaming::new(
            self.environment.clone(),
            self.aws.region.clone(),
            Some(self.aws.account_id.clone()),
        )
    }
}

impl AwsConfig {
    /// Build the shared AWS SDK configuration.
    ///
    /// Static credentials are used when both keys are configured; otherwise
    /// the default provider chain applies.
    pub async fn load_sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()));

        if let (Some(access), Some(secret)) = (&self.access_key, &self.secret_key) {
            loader = loader.credentials_provider(aws_sdk_sqs::config::Credentials::new(
                access.expose_secret(),
                secret.expose_secret(),
                None,
                None,
                "pubsub-common",
            ));
        }

        loader.load().await
    }
}

impl RedisConfig {
    /// Connection URL, kept secret because it may embed the password.
    /// Connection parameters for the pool. Built field by field so the
    /// password never passes through URL parsing.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                username: None,
                password: self
                    .password
                    .as_ref()
                    .map(|password| password.expose_secret().to_string()),
                ..Default::default()
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, name: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

fn minutes_or(value: Option<String>, name: &str, default: Duration) -> Result<Duration> {
    let minutes: Option<u64> = match value {
        Some(raw) => Some(parse_or(Some(raw), name, 0)?),
        None => None,
    };
    match minutes {
        Some(m) => m
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| Error::Config(format!("{name} is too large: {m} minutes"))),
        None => Ok(default),
    }
}

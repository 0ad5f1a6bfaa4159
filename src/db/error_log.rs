//! Persistent error log with production alerting.
//!
//! Rows go to `error_logs`. In production, entries that carry [`LogData`]
//! payload also raise a [`ServiceAlert`].

use super::Db;
use crate::config::{Environment, ResourceNaming};
use crate::error::Result;
use crate::publish::{Publisher, ServiceAlert};
use crate::telemetry::metrics;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Context attached to an error log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogData {
    pub car_id: Option<String>,
    pub user_id: Option<String>,
    pub data: Option<Value>,
}

/// One error to record.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    pub log_for: String,
    pub error: String,
    /// Caller location plus the error text.
    pub detail: String,
    pub data: Option<LogData>,
}

impl ErrorLog {
    /// Capture `error` together with the location of the caller.
    #[track_caller]
    pub fn new(log_for: impl Into<String>, error: impl fmt::Display) -> Self {
        let caller = Location::caller();
        Self {
            log_for: log_for.into(),
            error: format!("Error: {error}"),
            detail: format!(
                "[error] in {}:{}:{} {error}",
                caller.file(),
                caller.line(),
                caller.column()
            ),
            data: None,
        }
    }

    pub fn with_data(mut self, data: LogData) -> Self {
        self.data = Some(data);
        self
    }

    fn alert_payload(&self) -> Option<&LogData> {
        self.data.as_ref().filter(|d| d.data.is_some())
    }
}

/// Writes [`ErrorLog`] entries for one service.
#[derive(Clone)]
pub struct ErrorLogger {
    db: Db,
    naming: ResourceNaming,
    service_name: String,
    alerts: Option<Arc<dyn Publisher>>,
}

impl ErrorLogger {
    pub fn new(db: Db, naming: ResourceNaming, service_name: impl Into<String>) -> Self {
        Self {
            db,
            naming,
            service_name: service_name.into(),
            alerts: None,
        }
    }

    /// Publisher used for production alerts. Without one, no alerts are sent.
    pub fn with_alerts(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.alerts = Some(publisher);
        self
    }

    fn environment(&self) -> &Environment {
        self.naming.environment()
    }

    /// Alert if needed, then insert the row. Alert failures are only logged.
    pub async fn record(&self, log: ErrorLog) -> Result<Uuid> {
        self.raise_alert(&log).await;

        let id = Uuid::now_v7();
        let data = log.data.as_ref().map(serde_json::to_value).transpose()?;
        let created_at: DateTime<Utc> = Utc::now();

        sqlx::query(
            "INSERT INTO error_logs (id, error, detail, log_for, data, app_env, service_name, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(&log.error)
        .bind(&log.detail)
        .bind(&log.log_for)
        .bind(data)
        .bind(self.environment().as_str())
        .bind(&self.service_name)
        .bind(created_at)
        .execute(self.db.pool())
        .await?;

        metrics::error_logs_written().add(1, &[KeyValue::new("log_for", log.log_for)]);
        Ok(id)
    }

    /// Fire-and-forget form of [`record`](Self::record).
    pub async fn log(&self, log: ErrorLog) {
        let log_for = log.log_for.clone();
        if let Err(e) = self.record(log).await {
            error!(log_for = %log_for, error = %e, "failed to write error log");
        }
    }

    /// Send a [`ServiceAlert`] for `log` when running in production with a
    /// publisher configured and payload data attached. Returns whether the
    /// alert was published.
    pub async fn raise_alert(&self, log: &ErrorLog) -> bool {
        if !self.environment().is_production() {
            return false;
        }
        let (Some(publisher), Some(payload)) = (&self.alerts, log.alert_payload()) else {
            return false;
        };

        let data = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "cannot serialize alert data");
                return false;
            }
        };

        let alert = ServiceAlert {
            service: self.service_name.clone(),
            title: log.log_for.clone(),
            detail: log.detail.clone(),
            fallback_detail: log.error.clone(),
            data: Some(data),
            car_id: payload.car_id.clone(),
            user_id: payload.user_id.clone(),
        };

        match alert.send(publisher.as_ref(), &self.naming).await {
            Ok(_) => true,
            Err(e) => {
                warn!(log_for = %log.log_for, error = %e, "failed to send service alert");
                false
            }
        }
    }
}

impl fmt::Debug for ErrorLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorLogger")
            .field("service_name", &self.service_name)
            .field("environment", self.environment())
            .field("alerts", &self.alerts.is_some())
            .finish()
    }
}

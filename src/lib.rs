//! # pubsub-common
//!
//! Shared messaging plumbing for backend services.
//!
//! Provides a queue subscriber worker pool (SQS), topic publishing (SNS),
//! memory and Redis caches, a Postgres-backed error log, and
//! OpenTelemetry observability.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod publish;
pub mod queue;
pub mod response;
pub mod subscriber;
pub mod telemetry;

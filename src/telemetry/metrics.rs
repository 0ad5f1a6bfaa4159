//! Metric instrument factories for pubsub-common.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without a provider these are no-ops, which keeps tests quiet.

use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};

fn meter() -> Meter {
    opentelemetry::global::meter("pubsub-common")
}

/// Counter: provider-level queue calls.
/// Labels: `queue`, `operation` ("receive" | "receive_empty" | "delete").
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("pubsub.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: messages handed to a worker.
/// Labels: `queue`.
pub fn messages_received() -> Counter<u64> {
    meter()
        .u64_counter("pubsub.subscriber.messages_received")
        .with_description("Messages received by subscriber workers")
        .build()
}

/// Counter: message outcomes after the handler chain ran.
/// Labels: `queue`, `outcome` ("acked" | "handler_failed" | "ack_failed").
pub fn message_outcomes() -> Counter<u64> {
    meter()
        .u64_counter("pubsub.subscriber.message_outcomes")
        .with_description("Outcome of each dispatched message")
        .build()
}

/// Counter: receive calls that failed and triggered the backoff.
/// Labels: `queue`.
pub fn receive_errors() -> Counter<u64> {
    meter()
        .u64_counter("pubsub.subscriber.receive_errors")
        .with_description("Failed receive calls")
        .build()
}

/// Gauge-like counter of running poll loops.
/// Labels: `queue`.
pub fn active_workers() -> UpDownCounter<i64> {
    meter()
        .i64_up_down_counter("pubsub.subscriber.active_workers")
        .with_description("Poll loops currently running")
        .build()
}

/// Histogram: handler chain duration in milliseconds.
/// Labels: `queue`.
pub fn dispatch_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("pubsub.subscriber.dispatch_duration_ms")
        .with_description("Handler chain duration per message")
        .with_unit("ms")
        .build()
}

/// Counter: topic publishes.
/// Labels: `result` ("ok" | "error").
pub fn notifications_published() -> Counter<u64> {
    meter()
        .u64_counter("pubsub.publish.messages")
        .with_description("Messages published to topics")
        .build()
}

/// Counter: cache calls.
/// Labels: `backend`, `operation`, `result` ("hit" | "miss" | "ok" | "error").
pub fn cache_operations() -> Counter<u64> {
    meter()
        .u64_counter("pubsub.cache.operations")
        .with_description("Cache operations by backend")
        .build()
}

/// Counter: error-log rows written.
/// Labels: `log_for`.
pub fn error_logs_written() -> Counter<u64> {
    meter()
        .u64_counter("pubsub.error_log.writes")
        .with_description("Rows written to error_logs")
        .build()
}

//! Integration tests for telemetry initialization and span helpers.

use pubsub_common::telemetry::message::{record_outcome, start_message_span};
use pubsub_common::telemetry::{TelemetryConfig, init_telemetry, metrics};

#[test]
fn telemetry_initializes_without_endpoint() {
    // Note: tracing subscriber can only be set once per process.
    // Using try_init() in the implementation avoids panics if another
    // test already initialized a subscriber.
    let config = TelemetryConfig {
        endpoint: None,
        service_name: "pubsub-test".to_string(),
        default_level: "debug".to_string(),
    };
    // This may return Err if a global subscriber was already set by
    // another test in this process; that is acceptable.
    if let Ok(guard) = init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn message_span_creates_and_records_outcome() {
    let span = start_message_span("dev_orders", 3, "msg-1");
    record_outcome(&span, "acked");
}

#[test]
fn metric_instruments_are_noops_without_provider() {
    use opentelemetry::KeyValue;

    let queue = [KeyValue::new("queue", "dev_orders")];
    metrics::messages_received().add(2, &queue);
    metrics::receive_errors().add(1, &queue);
    metrics::active_workers().add(1, &queue);
    metrics::active_workers().add(-1, &queue);
    metrics::dispatch_duration_ms().record(1.5, &queue);
    metrics::message_outcomes().add(
        1,
        &[
            KeyValue::new("queue", "dev_orders"),
            KeyValue::new("outcome", "acked"),
        ],
    );
}

//! Message dispatch span helpers.
//!
//! One span per dispatched message, carrying the queue, worker and message
//! id, with the chain outcome recorded once the handlers finish.

use tracing::Span;

/// Start a span for dispatching one message through the handler chain.
///
/// `message.outcome` is declared empty and filled by [`record_outcome`].
pub fn start_message_span(queue: &str, worker: usize, message_id: &str) -> Span {
    tracing::info_span!(
        "message.dispatch",
        "messaging.destination" = queue,
        "messaging.worker" = worker,
        "messaging.message.id" = message_id,
        "message.outcome" = tracing::field::Empty,
    )
}

/// Record how dispatch ended ("acked", "handler_failed", "ack_failed").
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("message.outcome", outcome);
}

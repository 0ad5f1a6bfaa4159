//! Poll worker: one long-poll/dispatch loop.
//!
//! Cancellation is checked at three points only: the top of the loop, during
//! the receive-error backoff, and before each message of a batch. A receive
//! call or handler already in flight always runs to completion.

use super::handler::{ChainOutcome, HandlerChain};
use crate::queue::{Message, QueueClient, ReceiveRequest};
use crate::telemetry::message::{record_outcome, start_message_span};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{Instrument, Span, debug, error, warn};

/// State shared read-only by every worker of one subscriber.
pub(crate) struct WorkerShared {
    pub(crate) queue: Arc<dyn QueueClient>,
    pub(crate) queue_name: String,
    pub(crate) queue_url: String,
    pub(crate) request: ReceiveRequest,
    pub(crate) backoff: Duration,
    pub(crate) handlers: Arc<HandlerChain>,
    pub(crate) active: Arc<AtomicUsize>,
}

impl WorkerShared {
    fn labels(&self) -> [KeyValue; 1] {
        [KeyValue::new("queue", self.queue_name.clone())]
    }
}

pub(crate) struct PollWorker {
    id: usize,
    shared: Arc<WorkerShared>,
    shutdown: watch::Receiver<bool>,
}

impl PollWorker {
    pub(crate) fn new(id: usize, shared: Arc<WorkerShared>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            id,
            shared,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        let _active = ActiveGuard::enter(Arc::clone(&self.shared));
        debug!("poll worker started");

        loop {
            if self.is_cancelled() {
                break;
            }

            let batch = match self
                .shared
                .queue
                .receive_batch(&self.shared.queue_url, &self.shared.request)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        error = %e,
                        backoff_ms = self.shared.backoff.as_millis() as u64,
                        "receive failed, backing off"
                    );
                    metrics::receive_errors().add(1, &self.shared.labels());
                    if self.backoff().await {
                        break;
                    }
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }
            metrics::messages_received().add(batch.len() as u64, &self.shared.labels());

            let mut pending = batch.into_iter();
            while let Some(message) = pending.next() {
                if self.is_cancelled() {
                    debug!(
                        abandoned = pending.len() + 1,
                        "shutdown mid-batch, leaving remaining messages for redelivery"
                    );
                    break;
                }
                self.dispatch(message).await;
            }
        }

        debug!("poll worker stopped");
    }

    /// Set once by `stop`; a dropped subscriber counts as cancelled too.
    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Sleep for the backoff interval. Returns `true` if cancelled meanwhile.
    async fn backoff(&mut self) -> bool {
        let delay = self.shared.backoff;
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = cancelled(&mut self.shutdown) => true,
        }
    }

    async fn dispatch(&self, message: Message) {
        let span = start_message_span(&self.shared.queue_name, self.id, &message.id);

        async {
            let started = Instant::now();
            let outcome = self.shared.handlers.run(&message).await;
            metrics::dispatch_duration_ms().record(
                started.elapsed().as_secs_f64() * 1000.0,
                &self.shared.labels(),
            );

            let label = match outcome {
                ChainOutcome::Completed => match self
                    .shared
                    .queue
                    .delete(&self.shared.queue_url, &message.ack)
                    .await
                {
                    Ok(()) => {
                        debug!("message acknowledged");
                        "acked"
                    }
                    Err(e) => {
                        // Not retried: the message comes back after the visibility timeout.
                        error!(error = %e, "failed to delete processed message");
                        "ack_failed"
                    }
                },
                ChainOutcome::Failed {
                    index,
                    handler,
                    error,
                } => {
                    warn!(
                        handler = %handler,
                        position = index,
                        error = %error,
                        "handler failed, message left for redelivery"
                    );
                    "handler_failed"
                }
            };

            record_outcome(&Span::current(), label);
            metrics::message_outcomes().add(
                1,
                &[
                    KeyValue::new("queue", self.shared.queue_name.clone()),
                    KeyValue::new("outcome", label),
                ],
            );
        }
        .instrument(span)
        .await
    }
}

/// Resolves once the shutdown flag is set or the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Counts a worker as active for as long as its loop runs.
struct ActiveGuard {
    shared: Arc<WorkerShared>,
}

impl ActiveGuard {
    fn enter(shared: Arc<WorkerShared>) -> Self {
        shared.active.fetch_add(1, Ordering::SeqCst);
        metrics::active_workers().add(1, &shared.labels());
        Self { shared }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.shared.active.fetch_sub(1, Ordering::SeqCst);
        metrics::active_workers().add(-1, &self.shared.labels());
    }
}

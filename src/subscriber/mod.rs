//! Queue subscriber: a pool of independent long-polling workers.
//!
//! Each worker receives a batch, runs every message through the
//! [`HandlerChain`], and deletes the message only if all handlers succeed.
//! Lifecycle is an explicit state machine:
//!
//! ```text
//! Created --start--> Running --stop--> Draining --(workers joined)--> Stopped
//! ```
//!
//! # Example
//! ```no_run
//! use pubsub_common::config::Config;
//! use pubsub_common::subscriber::{Subscriber, handler_fn};
//!
//! # async fn run() -> pubsub_common::error::Result<()> {
//! let config = Config::from_env()?;
//! let mut subscriber = Subscriber::connect(&config, "orders", 4).await?;
//! subscriber.add_handler(handler_fn("log", |msg| {
//!     tracing::info!(id = %msg.id, "got message");
//!     Ok(())
//! }))?;
//! subscriber.start()?;
//! // ...
//! subscriber.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod handler;
pub mod settings;
mod worker;

pub use handler::{ChainOutcome, FnHandler, HandlerChain, HandlerError, MessageHandler, handler_fn};
pub use settings::SubscriberSettings;

use crate::config::{Config, ResourceNaming};
use crate::error::{Error, Result};
use crate::queue::{
    DEFAULT_VISIBILITY_TIMEOUT, MAX_BATCH_SIZE, MAX_WAIT_TIME, QueueClient, ReceiveRequest,
    SqsQueue,
};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span};
use worker::{PollWorker, WorkerShared};

/// Upper bound on workers per subscriber.
pub const MAX_WORKERS: usize = 100;
/// Wait between a failed receive and the next attempt.
pub const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);
/// Provider maximum visibility timeout (12 hours).
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

/// Lifecycle state of a [`Subscriber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Constructed; handlers may still be added.
    Created,
    /// Workers are polling.
    Running,
    /// Cancellation signalled, waiting for workers to exit.
    Draining,
    /// All workers exited. Terminal.
    Stopped,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolState::Created => "created",
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// Worker pool tuning. Bounds are checked once, at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberConfig {
    pub worker_count: usize,
    pub batch_size: i32,
    pub wait_time: Duration,
    pub visibility_timeout: Duration,
    pub receive_backoff: Duration,
}

impl SubscriberConfig {
    /// Provider maximums for batch and wait, default visibility and backoff.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            batch_size: MAX_BATCH_SIZE,
            wait_time: MAX_WAIT_TIME,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            receive_backoff: RECEIVE_BACKOFF,
        }
    }

    pub fn with_batch_size(mut self, batch_size: i32) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn with_receive_backoff(mut self, backoff: Duration) -> Self {
        self.receive_backoff = backoff;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WORKERS).contains(&self.worker_count) {
            return Err(Error::Config(format!(
                "worker count must be between 1 and {MAX_WORKERS}, got {}",
                self.worker_count
            )));
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(Error::Config(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.wait_time > MAX_WAIT_TIME {
            return Err(Error::Config(format!(
                "wait time must be at most {}s, got {}s",
                MAX_WAIT_TIME.as_secs(),
                self.wait_time.as_secs()
            )));
        }
        if self.visibility_timeout > MAX_VISIBILITY_TIMEOUT {
            return Err(Error::Config(format!(
                "visibility timeout must be at most {}s, got {}s",
                MAX_VISIBILITY_TIMEOUT.as_secs(),
                self.visibility_timeout.as_secs()
            )));
        }
        if self.receive_backoff.is_zero() {
            return Err(Error::Config("receive backoff must be non-zero".to_string()));
        }
        Ok(())
    }

    fn receive_request(&self) -> ReceiveRequest {
        ReceiveRequest {
            max_messages: self.batch_size,
            wait_time: self.wait_time,
            visibility_timeout: self.visibility_timeout,
        }
    }
}

type CloseHook = Box<dyn FnOnce() -> Result<()> + Send>;

/// Pool of poll workers consuming one queue.
pub struct Subscriber {
    queue: Arc<dyn QueueClient>,
    queue_name: String,
    queue_url: String,
    config: SubscriberConfig,
    handlers: HandlerChain,
    lifecycle: watch::Sender<PoolState>,
    // Handles leave the list only once joined, so an interrupted stop can resume.
    workers: AsyncMutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
    active: Arc<AtomicUsize>,
    close_hooks: Mutex<Vec<CloseHook>>,
}

impl Subscriber {
    /// Validate `config` and resolve the queue endpoint. No workers are created.
    ///
    /// The queue identifier goes through the environment naming rule before
    /// resolution. Any failure is reported as [`Error::Config`].
    pub async fn new(
        queue: Arc<dyn QueueClient>,
        naming: &ResourceNaming,
        queue_identifier: &str,
        config: SubscriberConfig,
    ) -> Result<Self> {
        config.validate()?;

        let queue_name = naming.queue_name(queue_identifier);
        let queue_url = queue
            .resolve_queue_url(&queue_name, naming.account_id())
            .await
            .map_err(|e| Error::Config(format!("cannot resolve queue {queue_name}: {e}")))?;

        info!(
            queue = %queue_name,
            workers = config.worker_count,
            "subscriber created"
        );

        let (lifecycle, _) = watch::channel(PoolState::Created);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            queue,
            queue_name,
            queue_url,
            config,
            handlers: HandlerChain::new(),
            lifecycle,
            workers: AsyncMutex::new(Vec::new()),
            shutdown,
            active: Arc::new(AtomicUsize::new(0)),
            close_hooks: Mutex::new(Vec::new()),
        })
    }

    /// Build an SQS-backed subscriber from application configuration.
    pub async fn connect(config: &Config, queue_identifier: &str, worker_count: usize) -> Result<Self> {
        let pool_config = SubscriberConfig::new(worker_count);
        pool_config.validate()?;
        let queue = SqsQueue::from_config(&config.aws).await;
        Self::new(Arc::new(queue), &config.naming(), queue_identifier, pool_config).await
    }

    /// Append a handler. Only allowed while the subscriber is `Created`.
    pub fn add_handler<H: MessageHandler + 'static>(&mut self, handler: H) -> Result<()> {
        let state = self.state();
        if state != PoolState::Created {
            return Err(Error::HandlersSealed(state));
        }
        self.handlers.push(handler);
        Ok(())
    }

    /// Register cleanup to run once after workers have stopped in [`close`](Self::close).
    pub fn on_close<F>(&mut self, hook: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.close_hooks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    /// Spawn the workers and return immediately.
    ///
    /// A second call while running is a no-op. Starting a stopped (or
    /// stopping) subscriber is rejected. Must be called inside a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut result = Ok(());
        self.lifecycle.send_if_modified(|state| match *state {
            PoolState::Created => {
                // Joiners only lock after leaving Created, so this never contends.
                let Ok(mut workers) = self.workers.try_lock() else {
                    result = Err(Error::InvalidTransition {
                        from: PoolState::Created,
                        to: PoolState::Running,
                    });
                    return false;
                };
                *workers = self.spawn_workers();
                *state = PoolState::Running;
                info!(
                    queue = %self.queue_name,
                    workers = self.config.worker_count,
                    handlers = self.handlers.len(),
                    "subscriber started"
                );
                true
            }
            PoolState::Running => false,
            from @ (PoolState::Draining | PoolState::Stopped) => {
                result = Err(Error::InvalidTransition {
                    from,
                    to: PoolState::Running,
                });
                false
            }
        });
        result
    }

    /// Signal cancellation and wait for every worker to exit.
    ///
    /// Safe to call any number of times, before or after `start`. Concurrent
    /// callers all return once the subscriber is `Stopped`. May take as long
    /// as the longest receive or handler call in flight. Dropping the returned
    /// future leaves the pool `Draining`; the next call resumes the join.
    pub async fn stop(&self) {
        let signalled = self.lifecycle.send_if_modified(|state| {
            if *state != PoolState::Running {
                return false;
            }
            *state = PoolState::Draining;
            self.shutdown.send_replace(true);
            true
        });
        if signalled {
            info!(queue = %self.queue_name, workers = self.config.worker_count, "stopping subscriber");
        }
        if self.state() != PoolState::Draining {
            return;
        }

        let mut workers = self.workers.lock().await;
        while let Some(handle) = workers.last_mut() {
            if let Err(e) = handle.await {
                error!(queue = %self.queue_name, error = %e, "poll worker ended abnormally");
            }
            workers.pop();
        }

        let stopped = self.lifecycle.send_if_modified(|state| {
            if *state != PoolState::Draining {
                return false;
            }
            *state = PoolState::Stopped;
            true
        });
        if stopped {
            info!(queue = %self.queue_name, "subscriber stopped");
        }
    }

    /// [`stop`](Self::stop), then run the close hooks once.
    ///
    /// Every hook runs; the first hook error is returned.
    pub async fn close(&self) -> Result<()> {
        self.stop().await;

        let hooks = std::mem::take(
            &mut *self
                .close_hooks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let mut result = Ok(());
        for hook in hooks {
            if let Err(e) = hook() {
                error!(queue = %self.queue_name, error = %e, "close hook failed");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    pub fn state(&self) -> PoolState {
        *self.lifecycle.borrow()
    }

    /// Number of poll loops currently running.
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Environment-qualified queue name.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    fn spawn_workers(&self) -> Vec<JoinHandle<()>> {
        let shared = Arc::new(WorkerShared {
            queue: Arc::clone(&self.queue),
            queue_name: self.queue_name.clone(),
            queue_url: self.queue_url.clone(),
            request: self.config.receive_request(),
            backoff: self.config.receive_backoff,
            handlers: Arc::new(self.handlers.clone()),
            active: Arc::clone(&self.active),
        });

        (0..self.config.worker_count)
            .map(|id| {
                let worker = PollWorker::new(id, Arc::clone(&shared), self.shutdown.subscribe());
                let span = info_span!("poll_worker", queue = %self.queue_name, worker = id);
                tokio::spawn(worker.run().instrument(span))
            })
            .collect()
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("queue_name", &self.queue_name)
            .field("state", &self.state())
            .field("config", &self.config)
            .field("handlers", &self.handlers)
            .finish()
    }
}

//! Handler chain: ordered message processing steps.
//!
//! Handlers run in registration order on the worker that owns the message.
//! The first failure stops the chain and the message is left on the queue.
//! A panicking handler counts as a failure.

use crate::queue::Message;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Error type returned by handlers. Any error type converts into it with `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// One processing step for a received message.
///
/// Messages are delivered at least once, so implementations must tolerate
/// seeing the same message again after a failure or a lost acknowledgment.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError>;

    /// Name used in logs when this handler fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapter that turns a plain closure into a [`MessageHandler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

/// Wrap a synchronous closure as a named handler.
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> FnHandler<F>
where
    F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync,
{
    FnHandler {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        (self.f)(message)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// How a message fared in the chain.
#[derive(Debug)]
pub enum ChainOutcome {
    /// Every handler succeeded (trivially true for an empty chain).
    Completed,
    /// A handler failed; later handlers did not run.
    Failed {
        index: usize,
        handler: String,
        error: HandlerError,
    },
}

impl ChainOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ChainOutcome::Completed)
    }
}

/// Append-only, ordered list of handlers.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn MessageHandler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<H: MessageHandler + 'static>(&mut self, handler: H) {
        self.handlers.push(Arc::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handlers against `message`, stopping at the first failure.
    pub async fn run(&self, message: &Message) -> ChainOutcome {
        for (index, handler) in self.handlers.iter().enumerate() {
            let result = AssertUnwindSafe(handler.handle(message))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(panic_error(payload)));
            if let Err(error) = result {
                return ChainOutcome::Failed {
                    index,
                    handler: handler.name().to_string(),
                    error,
                };
            }
        }
        ChainOutcome::Completed
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> HandlerError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string payload".to_string());
    format!("handler panicked: {detail}").into()
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

use async_trait::async_trait;
use thiserror::Error;

/// Handler errors
///
/// The dispatcher resolves both variants the same way (failure policy); they
/// are distinguished only for logging.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed task: {0}")]
    MalformedTask(String),
    #[error("task execution failed: {0}")]
    Execution(String),
}

/// Task handler trait
///
/// One implementation per queue; invoked once per delivery with the raw
/// message body. Handlers deserialize the payload themselves so producers and
/// consumers share only the payload contract, not a compiled schema.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn process(&self, body: &[u8]) -> Result<(), HandlerError>;
}

/// Builds a fresh handler instance per delivery.
///
/// The registry stores factories rather than handler singletons so that
/// per-message state can never leak between deliveries, and so a handler's
/// dependencies follow a per-invocation lifetime.
pub trait HandlerFactory: Send + Sync {
    /// The queue this handler consumes from
    fn queue_name(&self) -> &str;

    /// Create a new, independently-scoped handler instance
    fn create(&self) -> Box<dyn TaskHandler>;
}

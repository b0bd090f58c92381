use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

/// Boxed error produced by caller-supplied work.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Synchronous errors returned by queue operations.
///
/// These are programming or configuration mistakes on the caller side and are
/// reported immediately, never through a `TaskHandle`.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("no handler registered for task_type={0}")]
    InvalidTask(String),

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("unknown queue event: {0}")]
    UnknownEvent(String),

    #[error("invalid queue options: {0}")]
    Config(#[from] serde_json::Error),
}

/// Failure channel of a single task.
///
/// Every variant is scoped to the task that produced it; the queue keeps
/// draining after any of them.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error(transparent)]
    Failed(BoxError),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was cancelled before it settled")]
    Cancelled,
}

impl TaskError {
    /// Wrap any error (or message) raised by the task body.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Borrow the original error when this is a `Failed`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub(crate) fn from_join(err: tokio::task::JoinError) -> Self {
        if !err.is_panic() {
            return Self::Cancelled;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(message)
    }
}

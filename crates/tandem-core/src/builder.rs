//! QueueBuilder - queue construction and wiring.
//!
//! Fail-fast: options are validated and the tokio runtime is resolved in
//! `build()`, so a queue that exists can always schedule work.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::config::QueueOptions;
use crate::queue::AsyncQueue;
use crate::runtime::{HandlerRegistry, RegistryError, TaskHandler};

/// Builds an [`AsyncQueue`].
///
/// ```ignore
/// let queue = AsyncQueue::<String>::builder()
///     .timeout(Duration::from_secs(5))
///     .register("hello", Arc::new(HelloHandler))?
///     .start_stopped()
///     .build()?;
/// ```
pub struct QueueBuilder<T> {
    options: QueueOptions,
    registry: HandlerRegistry<T>,
    runtime: Option<Handle>,
    stopped: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("no tokio runtime available; build inside a runtime or pass one with `runtime()`")]
    NoRuntime,
}

impl<T: Send + 'static> QueueBuilder<T> {
    pub fn new() -> Self {
        Self {
            options: QueueOptions::default(),
            registry: HandlerRegistry::new(),
            runtime: None,
            stopped: false,
        }
    }

    /// Replace all options (timeout and any extra keys).
    pub fn options(mut self, options: QueueOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout_ms = crate::config::duration_to_ms(timeout);
        self
    }

    /// Register a handler reachable through `enqueue_named`.
    pub fn register(
        mut self,
        task_type: impl Into<String>,
        handler: Arc<dyn TaskHandler<T>>,
    ) -> Result<Self, RegistryError> {
        self.registry.register(task_type, handler)?;
        Ok(self)
    }

    /// Runtime used to spawn the drain and the task bodies.
    /// Defaults to the runtime `build()` is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the queue in the stopped state; nothing runs until `start()`.
    pub fn start_stopped(mut self) -> Self {
        self.stopped = true;
        self
    }

    pub fn build(self) -> Result<AsyncQueue<T>, BuildError> {
        if self.options.validate().is_err() {
            return Err(BuildError::InvalidTimeout);
        }
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };
        Ok(AsyncQueue::from_parts(
            self.options,
            Arc::new(self.registry),
            runtime,
            self.stopped,
        ))
    }
}

impl<T: Send + 'static> Default for QueueBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! tandem-core
//!
//! In-process sequential task queue: producers submit async work, the queue
//! runs it one task at a time in submission order, each task bounded by a
//! timeout, with lifecycle listeners and pause/resume.
//!
//! # モジュール構成
//! - **queue**: `AsyncQueue` (enqueue / drain loop / start / stop / peek)
//! - **events**: single-slot lifecycle listeners (enqueue, dequeue, empty, start, stop)
//! - **builder**: `QueueBuilder` (options, handlers, runtime)
//! - **config**: `QueueOptions` (serde, timeout + extra keys)
//! - **runtime**: named task handlers (`TaskHandler`, `HandlerRegistry`)
//! - **domain**: `TaskId`, `TaskInfo`
//! - **error**: `QueueError` (sync), `TaskError` (per task)
//! - **observability**: `QueueStats`

pub mod builder;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod observability;
pub mod queue;
pub mod runtime;

pub use builder::{BuildError, QueueBuilder};
pub use config::QueueOptions;
pub use domain::{TaskId, TaskInfo};
pub use error::{BoxError, QueueError, TaskError};
pub use events::QueueEvent;
pub use observability::QueueStats;
pub use queue::{AsyncQueue, TaskHandle};
pub use runtime::{HandlerRegistry, RegistryError, TaskHandler};

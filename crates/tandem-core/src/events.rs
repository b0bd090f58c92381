//! Lifecycle events of a queue.
//!
//! Each event has exactly one listener slot. Registering a listener replaces
//! whatever was there before; there is no unregister and no fan-out.
//!
//! Listeners run synchronously at the transition, with no queue lock held, so
//! they may call back into the queue (e.g. refill it from `on_empty`). A panic
//! inside a listener is caught and logged; it never reaches the scheduler.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::TaskInfo;
use crate::error::QueueError;
use crate::queue::AsyncQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEvent {
    Enqueue,
    Dequeue,
    Empty,
    Start,
    Stop,
}

impl QueueEvent {
    pub const ALL: [QueueEvent; 5] = [
        QueueEvent::Enqueue,
        QueueEvent::Dequeue,
        QueueEvent::Empty,
        QueueEvent::Start,
        QueueEvent::Stop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueEvent::Enqueue => "enqueue",
            QueueEvent::Dequeue => "dequeue",
            QueueEvent::Empty => "empty",
            QueueEvent::Start => "start",
            QueueEvent::Stop => "stop",
        }
    }
}

impl fmt::Display for QueueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueEvent {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| QueueError::UnknownEvent(s.to_string()))
    }
}

pub(crate) type TaskListener<T> = Arc<dyn Fn(&TaskInfo, &AsyncQueue<T>) + Send + Sync>;
pub(crate) type QueueListener<T> = Arc<dyn Fn(&AsyncQueue<T>) + Send + Sync>;
pub(crate) type EmptyListener = Arc<dyn Fn() + Send + Sync>;

/// One slot per event.
pub(crate) struct EventHub<T> {
    pub(crate) enqueue: Option<TaskListener<T>>,
    pub(crate) dequeue: Option<TaskListener<T>>,
    pub(crate) empty: Option<EmptyListener>,
    pub(crate) start: Option<QueueListener<T>>,
    pub(crate) stop: Option<QueueListener<T>>,
}

impl<T> EventHub<T> {
    pub(crate) fn new() -> Self {
        Self {
            enqueue: None,
            dequeue: None,
            empty: None,
            start: None,
            stop: None,
        }
    }

    pub(crate) fn has_listener(&self, event: QueueEvent) -> bool {
        match event {
            QueueEvent::Enqueue => self.enqueue.is_some(),
            QueueEvent::Dequeue => self.dequeue.is_some(),
            QueueEvent::Empty => self.empty.is_some(),
            QueueEvent::Start => self.start.is_some(),
            QueueEvent::Stop => self.stop.is_some(),
        }
    }
}

/// Run a listener, swallowing (and logging) a panic.
pub(crate) fn isolate(event: QueueEvent, listener: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(listener)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        tracing::warn!(%event, panic = %message, "queue listener panicked");
    }
}

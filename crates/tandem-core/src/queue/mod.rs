//! Sequential async queue.
//!
//! Tasks run one at a time, in submission order, each under the queue's
//! timeout. The queue can be paused (`stop`) and resumed (`start`) and reports
//! its lifecycle through single-slot listeners (see [`crate::events`]).
//!
//! Invariants enforced here:
//! - at most one task body runs at any time (`busy` guard, see `state`)
//! - `len()` equals the number of stored envelopes after every mutation
//! - every handle settles exactly once

mod envelope;
mod handle;
mod scheduler;
mod state;
mod store;

pub use handle::TaskHandle;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{Instrument, debug, info};

use self::envelope::{TaskEnvelope, TaskFuture, Work};
use self::state::SchedulerState;
use crate::builder::{BuildError, QueueBuilder};
use crate::config::{QueueOptions, duration_to_ms};
use crate::domain::{ANONYMOUS_TASK, TaskInfo};
use crate::error::{QueueError, TaskError};
use crate::events::{EventHub, QueueEvent, isolate};
use crate::observability::QueueStats;
use crate::runtime::HandlerRegistry;

/// Handle to a sequential queue. Cloning is cheap and every clone drives the
/// same queue.
///
/// Listeners receive the queue as an argument; use that instead of capturing
/// a clone inside the listener, otherwise the queue keeps itself alive.
pub struct AsyncQueue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    state: Mutex<SchedulerState<T>>,
    events: RwLock<EventHub<T>>,
    registry: Arc<HandlerRegistry<T>>,
    extra: BTreeMap<String, serde_json::Value>,
    runtime: Handle,
}

impl<T> Clone for AsyncQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> AsyncQueue<T> {
    /// Queue with default options on the current tokio runtime.
    pub fn new() -> Result<Self, BuildError> {
        Self::builder().build()
    }

    pub fn with_options(options: QueueOptions) -> Result<Self, BuildError> {
        Self::builder().options(options).build()
    }

    pub fn builder() -> QueueBuilder<T> {
        QueueBuilder::new()
    }

    pub(crate) fn from_parts(
        options: QueueOptions,
        registry: Arc<HandlerRegistry<T>>,
        runtime: Handle,
        stopped: bool,
    ) -> Self {
        let timeout = options.timeout();
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState::new(timeout, stopped)),
                events: RwLock::new(EventHub::new()),
                registry,
                extra: options.extra,
                runtime,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // enqueue
    // ---------------------------------------------------------------------

    /// Submit a unit of work. It runs after every task submitted before it.
    ///
    /// ```ignore
    /// let handle = queue.enqueue(|| async { Ok(5) });
    /// assert_eq!(handle.await?, 5);
    /// ```
    pub fn enqueue<F, Fut>(&self, work: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let work: Work<T> = Box::new(move |_args| -> TaskFuture<T> { Box::pin(work()) });
        self.submit(TaskInfo::new(ANONYMOUS_TASK, Vec::new()), work)
    }

    /// Submit work together with arguments.
    ///
    /// The arguments are fixed now and handed to `work` only when it runs.
    /// Until then they are visible through `peek` and the listeners.
    pub fn enqueue_with_args<F, Fut>(&self, work: F, args: Vec<serde_json::Value>) -> TaskHandle<T>
    where
        F: FnOnce(Vec<serde_json::Value>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let work: Work<T> = Box::new(move |args| -> TaskFuture<T> { Box::pin(work(args)) });
        self.submit(TaskInfo::new(ANONYMOUS_TASK, args), work)
    }

    /// Submit a task by registered type name.
    ///
    /// Fails immediately with [`QueueError::InvalidTask`] when no handler is
    /// registered under `task_type`; nothing is queued and no event fires.
    pub fn enqueue_named(
        &self,
        task_type: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<TaskHandle<T>, QueueError> {
        let handler = self
            .inner
            .registry
            .get(task_type)
            .ok_or_else(|| QueueError::InvalidTask(task_type.to_string()))?;
        let work: Work<T> = Box::new(move |args| -> TaskFuture<T> {
            Box::pin(async move { handler.call(args).await })
        });
        Ok(self.submit(TaskInfo::new(task_type, args), work))
    }

    fn submit(&self, info: TaskInfo, work: Work<T>) -> TaskHandle<T> {
        let (tx, rx) = oneshot::channel();
        let handle = TaskHandle::new(info.id(), rx);

        // enqueue listener sees the task before it is stored
        self.fire_task_event(QueueEvent::Enqueue, &info);

        let len = {
            let mut state = self.lock_state();
            state.store.push_back(TaskEnvelope::new(info, work, tx));
            state.store.len()
        };
        debug!(task_id = %handle.id(), len, "task enqueued");

        self.schedule();
        handle
    }

    /// Start a drain unless one is running, the queue is stopped, or there is
    /// nothing to do.
    fn schedule(&self) {
        let begin = {
            let mut state = self.lock_state();
            state.try_begin_drain()
        };
        if begin {
            let span = tracing::debug_span!("drain");
            self.inner
                .runtime
                .spawn(scheduler::drain(self.clone()).instrument(span));
        }
    }

    // ---------------------------------------------------------------------
    // start / stop
    // ---------------------------------------------------------------------

    /// Stop taking new tasks. A task that is already running finishes normally.
    pub fn stop(&self) {
        self.lock_state().stopped = true;
        info!("queue stopped");
        self.fire_queue_event(QueueEvent::Stop);
    }

    /// Resume draining.
    pub fn start(&self) {
        self.lock_state().stopped = false;
        info!("queue started");
        self.fire_queue_event(QueueEvent::Start);
        self.schedule();
    }

    // ---------------------------------------------------------------------
    // introspection
    // ---------------------------------------------------------------------

    /// Task at `index` (0 = next to run), without removing it.
    pub fn peek(&self, index: usize) -> Option<TaskInfo> {
        self.lock_state().store.peek(index).cloned()
    }

    /// Pending tasks. The task currently running is not counted.
    pub fn len(&self) -> usize {
        self.lock_state().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().store.is_empty()
    }

    /// Whether a drain currently owns the queue.
    pub fn is_busy(&self) -> bool {
        self.lock_state().busy
    }

    pub fn is_stopped(&self) -> bool {
        self.lock_state().stopped
    }

    pub fn timeout(&self) -> Duration {
        self.lock_state().timeout
    }

    /// Change the per-task timeout. Applies from the next task taken; a task
    /// that is already running keeps the timeout it started with.
    pub fn set_timeout(&self, timeout: Duration) -> Result<(), QueueError> {
        if timeout.is_zero() {
            return Err(QueueError::InvalidTimeout);
        }
        self.lock_state().timeout = timeout;
        Ok(())
    }

    /// Current options, including keys the queue does not interpret.
    pub fn options(&self) -> QueueOptions {
        QueueOptions {
            timeout_ms: duration_to_ms(self.timeout()),
            extra: self.inner.extra.clone(),
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.lock_state().stats()
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.inner.registry.registered_types()
    }

    // ---------------------------------------------------------------------
    // listeners (one per event, last registration wins)
    // ---------------------------------------------------------------------

    /// Called with the new task and the queue, before the task is stored.
    pub fn on_enqueue<F>(&self, listener: F)
    where
        F: Fn(&TaskInfo, &AsyncQueue<T>) + Send + Sync + 'static,
    {
        self.write_events().enqueue = Some(Arc::new(listener));
    }

    /// Called with the task just taken from the queue, right before it runs.
    pub fn on_dequeue<F>(&self, listener: F)
    where
        F: Fn(&TaskInfo, &AsyncQueue<T>) + Send + Sync + 'static,
    {
        self.write_events().dequeue = Some(Arc::new(listener));
    }

    /// Called once each time the last queued task has settled.
    pub fn on_empty<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.write_events().empty = Some(Arc::new(listener));
    }

    pub fn on_start<F>(&self, listener: F)
    where
        F: Fn(&AsyncQueue<T>) + Send + Sync + 'static,
    {
        self.write_events().start = Some(Arc::new(listener));
    }

    pub fn on_stop<F>(&self, listener: F)
    where
        F: Fn(&AsyncQueue<T>) + Send + Sync + 'static,
    {
        self.write_events().stop = Some(Arc::new(listener));
    }

    pub fn has_listener(&self, event: QueueEvent) -> bool {
        self.read_events().has_listener(event)
    }

    // ---------------------------------------------------------------------
    // internals
    // ---------------------------------------------------------------------

    // Listener panics are caught by `isolate`, so poisoning can only come
    // from a bug in this module; the state is still consistent in that case.
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState<T>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_events(&self) -> RwLockReadGuard<'_, EventHub<T>> {
        self.inner.events.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_events(&self) -> RwLockWriteGuard<'_, EventHub<T>> {
        self.inner.events.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire_task_event(&self, event: QueueEvent, info: &TaskInfo) {
        let listener = {
            let hub = self.read_events();
            match event {
                QueueEvent::Enqueue => hub.enqueue.clone(),
                QueueEvent::Dequeue => hub.dequeue.clone(),
                _ => None,
            }
        };
        if let Some(listener) = listener {
            isolate(event, || listener(info, self));
        }
    }

    fn fire_queue_event(&self, event: QueueEvent) {
        let listener = {
            let hub = self.read_events();
            match event {
                QueueEvent::Start => hub.start.clone(),
                QueueEvent::Stop => hub.stop.clone(),
                _ => None,
            }
        };
        if let Some(listener) = listener {
            isolate(event, || listener(self));
        }
    }

    fn fire_empty(&self) {
        let listener = self.read_events().empty.clone();
        if let Some(listener) = listener {
            isolate(QueueEvent::Empty, || listener());
        }
    }
}

//! Scheduler state guarded by the queue lock.

use std::time::Duration;

use super::envelope::TaskEnvelope;
use super::store::QueueStore;
use crate::error::TaskError;
use crate::observability::QueueStats;

/// Everything the scheduler decides on, kept behind one lock.
///
/// State transitions of `busy`:
/// - false -> true: `try_begin_drain` (from enqueue / start)
/// - true -> false: `take_next` finds the queue stopped or empty,
///   or `finish_task` leaves the store empty
///
/// `busy` is the only re-entrancy guard; at most one drain exists while it is
/// set.
pub(crate) struct SchedulerState<T> {
    pub(crate) store: QueueStore<T>,
    pub(crate) busy: bool,
    pub(crate) stopped: bool,
    pub(crate) timeout: Duration,
    running: bool,
    succeeded: usize,
    failed: usize,
    timed_out: usize,
}

/// How a single task ended, as far as the counters care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

impl TaskOutcome {
    pub(crate) fn of<R>(result: &Result<R, TaskError>) -> Self {
        match result {
            Ok(_) => TaskOutcome::Succeeded,
            Err(err) if err.is_timeout() => TaskOutcome::TimedOut,
            Err(_) => TaskOutcome::Failed,
        }
    }
}

/// What the drain does after a task has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AfterTask {
    /// More work is queued; take the next envelope.
    Continue,
    /// The store just became empty; fire `empty` and exit.
    Drained,
}

impl<T> SchedulerState<T> {
    pub(crate) fn new(timeout: Duration, stopped: bool) -> Self {
        Self {
            store: QueueStore::new(),
            busy: false,
            stopped,
            timeout,
            running: false,
            succeeded: 0,
            failed: 0,
            timed_out: 0,
        }
    }

    /// Claim the scheduler. Returns `true` if the caller must start a drain.
    pub(crate) fn try_begin_drain(&mut self) -> bool {
        if self.stopped || self.busy || self.store.is_empty() {
            return false;
        }
        self.busy = true;
        true
    }

    /// Pop the head envelope for the active drain, together with the timeout
    /// it runs under. Releases the scheduler when there is nothing to do.
    pub(crate) fn take_next(&mut self) -> Option<(TaskEnvelope<T>, Duration)> {
        if self.stopped {
            self.busy = false;
            return None;
        }
        match self.store.pop_front() {
            Some(envelope) => {
                self.running = true;
                Some((envelope, self.timeout))
            }
            None => {
                self.busy = false;
                None
            }
        }
    }

    /// Record the outcome of the task that just settled.
    pub(crate) fn finish_task(&mut self, outcome: TaskOutcome) -> AfterTask {
        self.running = false;
        match outcome {
            TaskOutcome::Succeeded => self.succeeded += 1,
            TaskOutcome::Failed => self.failed += 1,
            TaskOutcome::TimedOut => self.timed_out += 1,
        }
        if self.store.is_empty() {
            self.busy = false;
            AfterTask::Drained
        } else {
            AfterTask::Continue
        }
    }

    pub(crate) fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.store.len(),
            running: usize::from(self.running),
            succeeded: self.succeeded,
            failed: self.failed,
            timed_out: self.timed_out,
        }
    }
}

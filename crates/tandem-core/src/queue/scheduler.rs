//! The drain loop.
//!
//! A drain is spawned only by whoever flips `busy` from false to true (see
//! `SchedulerState::try_begin_drain`), so at most one runs per queue. It takes
//! envelopes one by one until the store is empty or the queue is stopped.
//! Continuing to the next task is a plain loop iteration, never a nested
//! call, so the stack stays flat no matter how deep the backlog is.

use std::time::Duration;

use tracing::{debug, trace, warn};

use super::AsyncQueue;
use super::envelope::TaskFuture;
use super::state::{AfterTask, TaskOutcome};
use crate::error::TaskError;
use crate::events::QueueEvent;

pub(crate) async fn drain<T: Send + 'static>(queue: AsyncQueue<T>) {
    loop {
        let next = {
            let mut state = queue.lock_state();
            state.take_next()
        };
        // stopped, or nothing left: busy はもう false になっている
        let Some((envelope, timeout)) = next else {
            trace!("drain idle");
            return;
        };

        let task_id = envelope.id();
        let (info, work, settle) = envelope.into_parts();
        debug!(%task_id, label = info.label(), "task dequeued");
        queue.fire_task_event(QueueEvent::Dequeue, &info);

        let result = run_with_timeout(work, timeout).await;
        let outcome = TaskOutcome::of(&result);
        match &result {
            Ok(_) => debug!(%task_id, "task succeeded"),
            Err(err) if err.is_timeout() => warn!(%task_id, error = %err, "task timed out"),
            Err(err) => debug!(%task_id, error = %err, "task failed"),
        }

        if !settle.send(result) {
            trace!(%task_id, "task handle dropped before settlement");
        }

        let after = {
            let mut state = queue.lock_state();
            state.finish_task(outcome)
        };
        if after == AfterTask::Drained {
            debug!("queue drained");
            queue.fire_empty();
            return;
        }
    }
}

/// Run the work on its own tokio task and race it against the timeout.
///
/// Errors, panics and timeouts all come back as `TaskError`. On timeout the
/// work task is aborted; its result can no longer reach anyone.
async fn run_with_timeout<T: Send + 'static>(
    work: TaskFuture<T>,
    timeout: Duration,
) -> Result<T, TaskError> {
    let mut task = tokio::spawn(work);
    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(TaskError::from_join(join_err)),
        Err(_elapsed) => {
            task.abort();
            Err(TaskError::Timeout(timeout))
        }
    }
}

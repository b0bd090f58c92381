//! Task envelope: work + bound args + the caller's completion channel.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::oneshot;

use crate::domain::{TaskId, TaskInfo};
use crate::error::TaskError;

pub(crate) type TaskFuture<T> = Pin<Box<dyn Future<Output = Result<T, TaskError>> + Send>>;

/// Type-erased unit of work. Called once, with the args bound at submission.
pub(crate) type Work<T> = Box<dyn FnOnce(Vec<serde_json::Value>) -> TaskFuture<T> + Send>;

pub(crate) struct TaskEnvelope<T> {
    info: TaskInfo,
    work: Work<T>,
    settle: oneshot::Sender<Result<T, TaskError>>,
}

impl<T> TaskEnvelope<T> {
    pub(crate) fn new(
        info: TaskInfo,
        work: Work<T>,
        settle: oneshot::Sender<Result<T, TaskError>>,
    ) -> Self {
        Self { info, work, settle }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.info.id()
    }

    pub(crate) fn info(&self) -> &TaskInfo {
        &self.info
    }

    /// Split into the pieces the scheduler needs.
    ///
    /// Consuming `self` means the work can only be started once, and the
    /// returned `Settle` can only be used once. The work closure is not called
    /// until the returned future is first polled, so a panic in its synchronous
    /// part surfaces wherever that future runs.
    pub(crate) fn into_parts(self) -> (TaskInfo, TaskFuture<T>, Settle<T>)
    where
        T: 'static,
    {
        let args = self.info.args().to_vec();
        let work = self.work;
        let future: TaskFuture<T> = Box::pin(async move { work(args).await });
        (self.info, future, Settle(self.settle))
    }
}

/// Single-use completion of a task handle.
pub(crate) struct Settle<T>(oneshot::Sender<Result<T, TaskError>>);

impl<T> Settle<T> {
    /// Returns `false` when the caller already dropped its handle.
    pub(crate) fn send(self, result: Result<T, TaskError>) -> bool {
        self.0.send(result).is_ok()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskId;

/// Label used for tasks submitted as plain closures.
pub const ANONYMOUS_TASK: &str = "anonymous";

/// Read-only view of a queued task.
///
/// This is what `peek` returns and what the enqueue/dequeue listeners receive.
/// The work itself and its completion channel stay inside the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    id: TaskId,
    label: String,
    args: Vec<serde_json::Value>,
    enqueued_at: DateTime<Utc>,
}

impl TaskInfo {
    pub fn new(label: impl Into<String>, args: Vec<serde_json::Value>) -> Self {
        Self {
            id: TaskId::generate(),
            label: label.into(),
            args,
            enqueued_at: Utc::now(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Registered task type for named tasks, [`ANONYMOUS_TASK`] otherwise.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Arguments bound at submission time.
    pub fn args(&self) -> &[serde_json::Value] {
        &self.args
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }
}

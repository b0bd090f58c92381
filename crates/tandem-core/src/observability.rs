use serde::{Deserialize, Serialize};

/// Counters describing what the queue has done so far.
///
/// `queued` and `running` are current values, the rest are totals since the
/// queue was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl QueueStats {
    /// Tasks that have settled, whatever the outcome.
    pub fn settled(&self) -> usize {
        self.succeeded + self.failed + self.timed_out
    }
}

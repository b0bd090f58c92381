use std::collections::VecDeque;

use super::envelope::TaskEnvelope;
use crate::domain::TaskInfo;

/// FIFO of pending envelopes. Head = oldest.
pub(crate) struct QueueStore<T> {
    items: VecDeque<TaskEnvelope<T>>,
}

impl<T> QueueStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub(crate) fn push_back(&mut self, envelope: TaskEnvelope<T>) {
        self.items.push_back(envelope);
    }

    pub(crate) fn pop_front(&mut self) -> Option<TaskEnvelope<T>> {
        self.items.pop_front()
    }

    pub(crate) fn peek(&self, index: usize) -> Option<&TaskInfo> {
        self.items.get(index).map(TaskEnvelope::info)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

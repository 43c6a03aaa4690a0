use std::collections::VecDeque;

use uthreads_abi::{MAX_THREAD_NUM, ThreadId};

/// FIFO of threads eligible to run.
///
/// Capacity for every possible thread is reserved up front, so enqueueing from
/// the preemption handler never allocates.
pub struct ReadyQueue {
    ids: VecDeque<ThreadId>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            ids: VecDeque::with_capacity(MAX_THREAD_NUM),
        }
    }

    /// Append `id` unless it is already queued. Returns whether it was added.
    pub fn enqueue(&mut self, id: ThreadId) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push_back(id);
        true
    }

    #[inline]
    pub fn dequeue(&mut self) -> Option<ThreadId> {
        self.ids.pop_front()
    }

    /// Remove `id` wherever it sits. Returns whether it was queued.
    pub fn remove(&mut self, id: ThreadId) -> bool {
        match self.ids.iter().position(|&queued| queued == id) {
            Some(pos) => {
                self.ids.remove(pos);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, id: ThreadId) -> bool {
        self.ids.contains(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.ids.iter().copied()
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

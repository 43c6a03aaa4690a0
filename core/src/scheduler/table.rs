use uthreads_abi::{MAX_THREAD_NUM, ThreadError, ThreadId, ThreadResult};

use super::thread::LogicalThread;

/// Fixed-capacity map from identifier to live thread.
///
/// Slot `i` holds the thread with id `i`. New threads take the smallest empty
/// slot, so identifiers of terminated threads are reused.
pub struct ThreadTable {
    slots: Vec<Option<Box<LogicalThread>>>,
    live: usize,
}

impl ThreadTable {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_THREAD_NUM).map(|_| None).collect(),
            live: 0,
        }
    }

    pub fn find_free_slot(&self) -> Option<ThreadId> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(ThreadId::from)
    }

    /// Place `thread` in the slot named by its id. The slot must be empty.
    pub fn insert(&mut self, thread: LogicalThread) {
        let index = thread.id().index();
        debug_assert!(self.slots[index].is_none(), "slot {index} already taken");
        self.slots[index] = Some(Box::new(thread));
        self.live += 1;
    }

    pub fn remove(&mut self, id: ThreadId) -> Option<Box<LogicalThread>> {
        let removed = self.slots.get_mut(id.index())?.take();
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    #[inline]
    pub fn get(&self, id: ThreadId) -> Option<&LogicalThread> {
        self.slots.get(id.index())?.as_deref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut LogicalThread> {
        self.slots.get_mut(id.index())?.as_deref_mut()
    }

    pub fn lookup(&self, id: ThreadId) -> ThreadResult<&LogicalThread> {
        if !id.in_range() {
            return Err(ThreadError::InvalidId);
        }
        self.get(id).ok_or(ThreadError::NoSuchThread)
    }

    pub fn lookup_mut(&mut self, id: ThreadId) -> ThreadResult<&mut LogicalThread> {
        if !id.in_range() {
            return Err(ThreadError::InvalidId);
        }
        self.get_mut(id).ok_or(ThreadError::NoSuchThread)
    }

    #[inline]
    pub fn contains(&self, id: ThreadId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn live_ids(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| ThreadId::from(index))
    }
}

impl Default for ThreadTable {
    fn default() -> Self {
        Self::new()
    }
}

use uthreads_abi::{MAIN_THREAD_ID, STACK_SIZE, ThreadId, ThreadResult, ThreadState};

use super::stack::ThreadStack;
use super::switch_context::{ContextEntry, ExecutionContext};

/// User entry function of a spawned thread.
#[derive(Clone, Copy, Debug)]
pub enum ThreadEntry {
    Rust(fn()),
    C(extern "C" fn()),
}

impl ThreadEntry {
    #[inline]
    pub fn call(self) {
        match self {
            Self::Rust(entry) => entry(),
            Self::C(entry) => entry(),
        }
    }
}

/// One schedulable flow of control.
///
/// Records live in `Box`es inside the thread table, so the address of
/// `context` stays fixed for the thread's whole life and can be handed to the
/// switch routine after the scheduler lock is released.
#[derive(Debug)]
pub struct LogicalThread {
    id: ThreadId,
    state: ThreadState,
    quantum_count: u64,
    context: ExecutionContext,
    /// `None` for the main thread, which runs on the process stack.
    stack: Option<ThreadStack>,
    entry: Option<ThreadEntry>,
    /// Thread this one is sync-waiting on.
    waiting_for: Option<ThreadId>,
    /// Threads sync-waiting on this one.
    waiters: Vec<ThreadId>,
}

impl LogicalThread {
    /// Record for the thread that called `init`. It is already running its
    /// first quantum.
    pub fn main() -> Self {
        Self {
            id: MAIN_THREAD_ID,
            state: ThreadState::Running,
            quantum_count: 1,
            context: ExecutionContext::zero(),
            stack: None,
            entry: None,
            waiting_for: None,
            waiters: Vec::new(),
        }
    }

    /// Record for a new thread whose first switch-in lands in `start`.
    pub fn spawned(id: ThreadId, entry: ThreadEntry, start: ContextEntry) -> ThreadResult<Self> {
        let stack = ThreadStack::allocate(STACK_SIZE)?;
        let context = ExecutionContext::seeded(stack.top(), start);
        Ok(Self {
            id,
            state: ThreadState::Ready,
            quantum_count: 0,
            context,
            stack: Some(stack),
            entry: Some(entry),
            waiting_for: None,
            waiters: Vec::new(),
        })
    }

    #[inline]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    #[inline]
    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    #[inline]
    pub fn quantum_count(&self) -> u64 {
        self.quantum_count
    }

    #[inline]
    pub fn inc_quantum(&mut self) {
        self.quantum_count += 1;
    }

    #[inline]
    pub fn entry(&self) -> Option<ThreadEntry> {
        self.entry
    }

    #[inline]
    pub fn stack(&self) -> Option<&ThreadStack> {
        self.stack.as_ref()
    }

    #[inline]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    #[inline]
    pub fn context_ptr(&mut self) -> *mut ExecutionContext {
        &raw mut self.context
    }

    #[inline]
    pub fn waiting_for(&self) -> Option<ThreadId> {
        self.waiting_for
    }

    #[inline]
    pub fn is_sync_waiting(&self) -> bool {
        self.waiting_for.is_some()
    }

    pub fn set_waiting_for(&mut self, target: Option<ThreadId>) {
        self.waiting_for = target;
    }

    #[inline]
    pub fn has_waiters(&self) -> bool {
        !self.waiters.is_empty()
    }

    #[inline]
    pub fn waiters(&self) -> &[ThreadId] {
        &self.waiters
    }

    pub fn add_waiter(&mut self, waiter: ThreadId) {
        if !self.waiters.contains(&waiter) {
            self.waiters.push(waiter);
        }
    }

    pub fn remove_waiter(&mut self, waiter: ThreadId) {
        self.waiters.retain(|&w| w != waiter);
    }

    pub fn take_waiters(&mut self) -> Vec<ThreadId> {
        core::mem::take(&mut self.waiters)
    }
}

//! Round-robin scheduler state machine.
//!
//! Every operation here is a pure state transition performed under the
//! scheduler lock. Operations that change which thread runs do not switch
//! themselves; they return a [`SwitchPlan`] naming the context to save into and
//! the context to resume, and the runtime executes the plan after the lock has
//! been released.

use uthreads_abi::{
    MAIN_THREAD_ID, Quantum, QuantumTimer, REAPER_STACK_SIZE, ThreadError, ThreadId,
    ThreadResult, ThreadState,
};
use uthreads_lib::{klog_debug, klog_info, klog_trace};

use super::ready_queue::ReadyQueue;
use super::stack::ThreadStack;
use super::switch_context::{ContextEntry, ExecutionContext};
use super::table::ThreadTable;
use super::thread::{LogicalThread, ThreadEntry};

/// A context switch decided under the lock and carried out after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchPlan {
    pub save_into: *mut ExecutionContext,
    pub resume_from: *const ExecutionContext,
}

/// Where the first switch into a context lands.
#[derive(Clone, Copy)]
pub struct EntryPoints {
    /// Seeded into every spawned thread.
    pub thread_start: ContextEntry,
    /// Seeded into the reaper before each use.
    pub reaper_start: ContextEntry,
}

/// Why the running thread gives up the CPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SwitchReason {
    Preempt,
    Yield,
    Block,
    Sync(ThreadId),
}

impl SwitchReason {
    /// Whether the running thread can keep running when nobody else is ready.
    fn may_continue_alone(self) -> bool {
        matches!(self, Self::Preempt | Self::Yield)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reap {
    /// Reclaim a thread that terminated itself, then resume `current`.
    Thread(ThreadId),
    /// Reclaim every thread and end the process.
    Shutdown,
}

/// Outcome of [`Scheduler::terminate`].
#[derive(Debug, PartialEq, Eq)]
pub enum Termination {
    /// Another thread was reclaimed in place; the caller keeps running.
    Reclaimed,
    /// The caller must switch to the reaper. The switch never returns.
    Reap(SwitchPlan),
}

/// What the reaper does after reclaiming.
#[derive(Debug, PartialEq, Eq)]
pub enum ReapOutcome {
    Resume(*const ExecutionContext),
    Exit,
}

/// Auxiliary stack that runs reclamation when a thread cannot free its own
/// stack because it is still running on it.
struct Reaper {
    stack: ThreadStack,
    context: ExecutionContext,
    /// Save slot for switches whose outgoing context is never resumed.
    scratch: ExecutionContext,
    pending: Option<Reap>,
}

pub struct Scheduler<T: QuantumTimer> {
    quantum: Quantum,
    total_quanta: u64,
    current: ThreadId,
    table: ThreadTable,
    ready: ReadyQueue,
    reaper: Box<Reaper>,
    timer: T,
    entries: EntryPoints,
}

impl<T: QuantumTimer> Scheduler<T> {
    /// Scheduler with the calling thread registered as the running main thread.
    /// The timer stays disarmed until [`Scheduler::start`].
    pub fn new(quantum: Quantum, timer: T, entries: EntryPoints) -> ThreadResult<Self> {
        let reaper = Box::new(Reaper {
            stack: ThreadStack::allocate(REAPER_STACK_SIZE)?,
            context: ExecutionContext::zero(),
            scratch: ExecutionContext::zero(),
            pending: None,
        });

        let mut table = ThreadTable::new();
        table.insert(LogicalThread::main());

        Ok(Self {
            quantum,
            total_quanta: 1,
            current: MAIN_THREAD_ID,
            table,
            ready: ReadyQueue::new(),
            reaper,
            timer,
            entries,
        })
    }

    pub fn start(&mut self) {
        klog_info!(
            "uthreads: scheduler started, quantum {} us",
            self.quantum.as_micros()
        );
        self.timer.arm(self.quantum);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[inline]
    pub fn current_id(&self) -> ThreadId {
        self.current
    }

    #[inline]
    pub fn total_quanta(&self) -> u64 {
        self.total_quanta
    }

    #[inline]
    pub fn quantum(&self) -> Quantum {
        self.quantum
    }

    pub fn thread_quanta(&self, id: ThreadId) -> ThreadResult<u64> {
        Ok(self.table.lookup(id)?.quantum_count())
    }

    pub fn thread_state(&self, id: ThreadId) -> ThreadResult<ThreadState> {
        Ok(self.table.lookup(id)?.state())
    }

    pub fn waiting_for(&self, id: ThreadId) -> ThreadResult<Option<ThreadId>> {
        Ok(self.table.lookup(id)?.waiting_for())
    }

    pub fn current_entry(&self) -> Option<ThreadEntry> {
        self.table.get(self.current).and_then(LogicalThread::entry)
    }

    pub fn thread_count(&self) -> usize {
        self.table.len()
    }

    pub fn ready_ids(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.ready.iter()
    }

    pub fn live_ids(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.table.live_ids()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    // =========================================================================
    // Thread lifecycle
    // =========================================================================

    pub fn spawn(&mut self, entry: ThreadEntry) -> ThreadResult<ThreadId> {
        let id = self
            .table
            .find_free_slot()
            .ok_or(ThreadError::CapacityReached)?;
        let thread = LogicalThread::spawned(id, entry, self.entries.thread_start)?;
        self.table.insert(thread);
        self.ready.enqueue(id);
        klog_debug!(
            "uthreads: spawned thread {} ({} live, {} ready)",
            id,
            self.table.len(),
            self.ready.len()
        );
        Ok(id)
    }

    /// Terminate `id`.
    ///
    /// Terminating the main thread plans a full shutdown. A thread terminating
    /// itself hands the CPU to the next ready thread through the reaper. Any
    /// other thread is reclaimed immediately.
    pub fn terminate(&mut self, id: ThreadId) -> ThreadResult<Termination> {
        self.table.lookup(id)?;

        if id.is_main() {
            self.timer.disarm();
            return Ok(Termination::Reap(self.plan_reap(Reap::Shutdown)));
        }

        if id == self.current {
            let next = self.next_ready().ok_or(ThreadError::NoRunnableThread)?;
            self.timer.disarm();
            self.begin_quantum(next);
            self.timer.arm(self.quantum);
            klog_debug!("uthreads: thread {} exiting, {} runs next", id, next);
            return Ok(Termination::Reap(self.plan_reap(Reap::Thread(id))));
        }

        self.reclaim(id);
        Ok(Termination::Reclaimed)
    }

    /// Block `id`. Blocking the running thread yields to the next ready one.
    pub fn block(&mut self, id: ThreadId) -> ThreadResult<Option<SwitchPlan>> {
        if id.is_main() {
            return Err(ThreadError::ReservedId);
        }
        self.table.lookup(id)?;

        if id == self.current {
            return self.switch_to_next(SwitchReason::Block);
        }

        self.ready.remove(id);
        if let Some(thread) = self.table.get_mut(id) {
            thread.set_state(ThreadState::Blocked);
        }
        Ok(None)
    }

    /// Clear the block flag of `id`. A thread still sync-waiting stays off
    /// the ready queue until its target terminates.
    pub fn resume(&mut self, id: ThreadId) -> ThreadResult<()> {
        let thread = self.table.lookup_mut(id)?;
        if !thread.state().is_blocked() {
            return Ok(());
        }
        thread.set_state(ThreadState::Ready);
        if !thread.is_sync_waiting() {
            self.ready.enqueue(id);
        }
        Ok(())
    }

    /// Make the running thread wait until `target` terminates.
    pub fn sync(&mut self, target: ThreadId) -> ThreadResult<SwitchPlan> {
        if target.is_main() {
            return Err(ThreadError::ReservedId);
        }
        self.table.lookup(target)?;
        if target == self.current {
            return Err(ThreadError::SelfReference);
        }
        if self.current.is_main() {
            return Err(ThreadError::MainThreadSync);
        }

        self.switch_to_next(SwitchReason::Sync(target))?
            .ok_or(ThreadError::NoRunnableThread)
    }

    /// Quantum expiry. Returns `None` when the running thread keeps the CPU.
    pub fn preempt(&mut self) -> Option<SwitchPlan> {
        self.switch_to_next(SwitchReason::Preempt).ok().flatten()
    }

    /// Give up the rest of the running quantum.
    pub fn yield_now(&mut self) -> Option<SwitchPlan> {
        self.switch_to_next(SwitchReason::Yield).ok().flatten()
    }

    // =========================================================================
    // Reaper protocol
    // =========================================================================

    /// Run the pending reclamation. Called on the reaper stack.
    pub fn reap_pending(&mut self) -> ReapOutcome {
        match self.reaper.pending.take() {
            Some(Reap::Thread(victim)) => {
                self.reclaim(victim);
                ReapOutcome::Resume(self.current_context())
            }
            Some(Reap::Shutdown) => {
                self.shutdown();
                ReapOutcome::Exit
            }
            None => ReapOutcome::Resume(self.current_context()),
        }
    }

    /// Reclaim every thread, main last, with the timer stopped.
    pub fn shutdown(&mut self) {
        self.timer.disarm();
        let ids: Vec<ThreadId> = self.table.live_ids().filter(|id| !id.is_main()).collect();
        for id in ids.into_iter().rev() {
            self.reclaim(id);
        }
        self.table.remove(MAIN_THREAD_ID);
        self.ready.clear();
        klog_info!("uthreads: shutdown after {} quanta", self.total_quanta);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// The single switching protocol shared by preemption, yield, block and
    /// sync: pick the next ready thread, dispose of the running one according
    /// to `reason`, and account the new quantum.
    fn switch_to_next(&mut self, reason: SwitchReason) -> ThreadResult<Option<SwitchPlan>> {
        self.timer.disarm();

        let Some(next) = self.next_ready() else {
            self.timer.arm(self.quantum);
            if !reason.may_continue_alone() {
                return Err(ThreadError::NoRunnableThread);
            }
            self.total_quanta += 1;
            if let Some(running) = self.table.get_mut(self.current) {
                running.inc_quantum();
            }
            klog_trace!("uthreads: thread {} keeps the cpu", self.current);
            return Ok(None);
        };

        let prev = self.current;
        let save_into = match self.table.get_mut(prev) {
            Some(running) => {
                match reason {
                    SwitchReason::Preempt | SwitchReason::Yield => {
                        running.set_state(ThreadState::Ready);
                    }
                    SwitchReason::Block => running.set_state(ThreadState::Blocked),
                    SwitchReason::Sync(target) => {
                        running.set_state(ThreadState::Ready);
                        running.set_waiting_for(Some(target));
                    }
                }
                running.context_ptr()
            }
            None => self.reaper.scratch_ptr(),
        };

        match reason {
            SwitchReason::Preempt | SwitchReason::Yield => {
                self.ready.enqueue(prev);
            }
            SwitchReason::Sync(target) => {
                if let Some(target) = self.table.get_mut(target) {
                    target.add_waiter(prev);
                }
            }
            SwitchReason::Block => {}
        }

        let resume_from = self.begin_quantum(next);
        self.timer.arm(self.quantum);
        klog_trace!("uthreads: switch {} -> {} ({:?})", prev, next, reason);

        Ok(Some(SwitchPlan {
            save_into,
            resume_from,
        }))
    }

    /// Pop the first queued thread that is still live.
    fn next_ready(&mut self) -> Option<ThreadId> {
        while let Some(id) = self.ready.dequeue() {
            if self.table.contains(id) {
                return Some(id);
            }
        }
        None
    }

    /// Make `next` the running thread and count its quantum.
    fn begin_quantum(&mut self, next: ThreadId) -> *const ExecutionContext {
        self.total_quanta += 1;
        self.current = next;
        if let Some(thread) = self.table.get_mut(next) {
            thread.set_state(ThreadState::Running);
            thread.inc_quantum();
        }
        self.current_context()
    }

    fn current_context(&mut self) -> *const ExecutionContext {
        match self.table.get_mut(self.current) {
            Some(thread) => thread.context_ptr(),
            None => self.reaper.scratch_ptr(),
        }
    }

    /// Seed the reaper and plan the switch into it from the running thread.
    fn plan_reap(&mut self, reap: Reap) -> SwitchPlan {
        let dying = match reap {
            Reap::Thread(victim) => victim,
            Reap::Shutdown => self.current,
        };
        self.reaper.pending = Some(reap);
        self.reaper.context =
            ExecutionContext::seeded(self.reaper.stack.top(), self.entries.reaper_start);

        let save_into = match self.table.get_mut(dying) {
            Some(thread) => thread.context_ptr(),
            None => self.reaper.scratch_ptr(),
        };
        SwitchPlan {
            save_into,
            resume_from: &raw const self.reaper.context,
        }
    }

    /// Remove `victim` from every structure and free it. Threads that were
    /// sync-waiting on it become runnable again unless they are blocked.
    fn reclaim(&mut self, victim: ThreadId) {
        let Some(mut thread) = self.table.remove(victim) else {
            return;
        };
        self.ready.remove(victim);

        if let Some(target) = thread.waiting_for() {
            if let Some(target) = self.table.get_mut(target) {
                target.remove_waiter(victim);
            }
        }

        for waiter in thread.take_waiters() {
            let runnable = match self.table.get_mut(waiter) {
                Some(waiting) => {
                    waiting.set_waiting_for(None);
                    !waiting.state().is_blocked()
                }
                None => false,
            };
            if runnable {
                self.ready.enqueue(waiter);
            }
        }

        klog_debug!(
            "uthreads: reclaimed thread {} after {} quanta",
            victim,
            thread.quantum_count()
        );
    }
}

impl Reaper {
    fn scratch_ptr(&mut self) -> *mut ExecutionContext {
        &raw mut self.scratch
    }
}

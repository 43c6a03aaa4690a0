//! Process-wide scheduler instance.
//!
//! The scheduler lives in a `Once`-initialised [`PreemptMutex`]. Every entry
//! point takes the lock only long enough to compute a [`SwitchPlan`], drops it,
//! and then performs the switch with preemption still masked by its own
//! [`PreemptGuard`]. The preemption handler runs with the signal masked by the
//! kernel and follows the same rule.

use libc::c_int;
use spin::Once;

use uthreads_abi::{Quantum, ThreadError, ThreadId, ThreadResult, ThreadState};
use uthreads_lib::preempt::enable_preemption;
use uthreads_lib::{InitFlag, PreemptGuard, PreemptMutex, klog_debug, klog_error};

use super::ffi_boundary;
use super::scheduler::{EntryPoints, ReapOutcome, Scheduler, SwitchPlan, Termination};
use super::switch_context;
use super::thread::ThreadEntry;
use super::timer::{self, VirtualTimer};

pub type GlobalScheduler = Scheduler<VirtualTimer>;

static SCHEDULER: Once<PreemptMutex<GlobalScheduler>> = Once::new();
static SCHEDULER_INIT: InitFlag = InitFlag::new();

const ENTRY_POINTS: EntryPoints = EntryPoints {
    thread_start: ffi_boundary::thread_start,
    reaper_start: ffi_boundary::reaper_start,
};

/// Run `f` under the scheduler lock.
pub fn with_scheduler<R>(
    f: impl FnOnce(&mut GlobalScheduler) -> ThreadResult<R>,
) -> ThreadResult<R> {
    let scheduler = SCHEDULER.get().ok_or(ThreadError::NotInitialized)?;
    let mut guard = scheduler.lock();
    f(&mut guard)
}

/// Like [`with_scheduler`] but gives up instead of spinning.
fn try_with_scheduler<R>(f: impl FnOnce(&mut GlobalScheduler) -> R) -> Option<R> {
    let mut guard = SCHEDULER.get()?.try_lock()?;
    Some(f(&mut guard))
}

pub fn is_initialized() -> bool {
    SCHEDULER_INIT.is_done()
}

/// Report an unrecoverable failure and end the process.
pub fn fatal(err: ThreadError) -> ! {
    klog_error!("system error: {}", err);
    std::process::exit(1)
}

fn run_plan(plan: SwitchPlan) {
    // SAFETY: plans point into boxed thread records or the reaper, which stay
    // alive until reclaimed under the lock, and the lock is no longer held.
    unsafe { switch_context::switch(plan.save_into, plan.resume_from) }
}

pub fn init(quantum: Quantum) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();

    let claim = SCHEDULER_INIT
        .claim()
        .ok_or(ThreadError::AlreadyInitialized)?;
    let scheduler = Scheduler::new(quantum, VirtualTimer::new(), ENTRY_POINTS)?;
    timer::install_handler(on_quantum_expired)?;

    SCHEDULER.call_once(move || PreemptMutex::new(scheduler));
    claim.complete();

    with_scheduler(|s| {
        s.start();
        Ok(())
    })
}

pub fn spawn(entry: ThreadEntry) -> ThreadResult<ThreadId> {
    let _preempt = PreemptGuard::new();
    with_scheduler(|s| s.spawn(entry))
}

/// Terminate `id`. Does not return when `id` is the caller or the main thread.
pub fn terminate(id: ThreadId) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    match with_scheduler(|s| s.terminate(id))? {
        Termination::Reclaimed => Ok(()),
        Termination::Reap(plan) => {
            run_plan(plan);
            unreachable!("thread {id} resumed after termination")
        }
    }
}

pub fn block(id: ThreadId) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    if let Some(plan) = with_scheduler(|s| s.block(id))? {
        run_plan(plan);
    }
    Ok(())
}

pub fn resume(id: ThreadId) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    with_scheduler(|s| s.resume(id))
}

/// Wait until `id` terminates. Returns once the caller is scheduled again.
pub fn sync(id: ThreadId) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    let plan = with_scheduler(|s| s.sync(id))?;
    run_plan(plan);
    Ok(())
}

pub fn yield_now() -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    if let Some(plan) = with_scheduler(|s| Ok(s.yield_now()))? {
        run_plan(plan);
    }
    Ok(())
}

pub fn current_id() -> ThreadResult<ThreadId> {
    with_scheduler(|s| Ok(s.current_id()))
}

pub fn total_quanta() -> ThreadResult<u64> {
    with_scheduler(|s| Ok(s.total_quanta()))
}

pub fn thread_quanta(id: ThreadId) -> ThreadResult<u64> {
    with_scheduler(|s| s.thread_quanta(id))
}

pub fn thread_state(id: ThreadId) -> ThreadResult<ThreadState> {
    with_scheduler(|s| s.thread_state(id))
}

extern "C" fn on_quantum_expired(_signal: c_int) {
    match try_with_scheduler(GlobalScheduler::preempt) {
        Some(Some(plan)) => run_plan(plan),
        Some(None) => {}
        None => klog_debug!("uthreads: quantum expired while scheduler busy"),
    }
}

pub(super) fn thread_start_impl() -> ! {
    let entry = match with_scheduler(|s| Ok(s.current_entry())) {
        Ok(entry) => entry,
        Err(err) => fatal(err),
    };
    enable_preemption();

    if let Some(entry) = entry {
        entry.call();
    }

    match current_id().and_then(terminate) {
        Ok(()) => unreachable!("returning thread outlived its termination"),
        Err(err) => fatal(err),
    }
}

pub(super) fn reaper_start_impl() -> ! {
    match with_scheduler(|s| Ok(s.reap_pending())) {
        // SAFETY: the resumed context belongs to the thread the scheduler just
        // made current; the lock was released when the closure returned.
        Ok(ReapOutcome::Resume(context)) => unsafe { switch_context::restore(context) },
        Ok(ReapOutcome::Exit) => {
            klog_debug!("uthreads: all threads reclaimed, exiting");
            std::process::exit(0)
        }
        Err(err) => fatal(err),
    }
}

//! User-level green threads.
//!
//! Many logical threads share one native thread. Each has its own stack; a
//! virtual interval timer ends every quantum and the scheduler hands the CPU to
//! the next ready thread in FIFO order. Threads can block and resume each
//! other, wait for another thread to terminate, and terminate themselves or
//! others. Terminating the main thread (id 0) ends the process.
//!
//! Every operation masks preemption for its whole duration. Recoverable
//! failures are reported as `thread library error: <message>` on standard error
//! and returned; resource and protocol failures are reported as
//! `system error: <message>` and end the process with status 1.
//!
//! The allocator is not preemption-safe. A thread preempted inside `malloc`
//! can leave its lock held for the next thread, so entry functions should
//! allocate only while holding a [`PreemptGuard`].
//!
//! ```ignore
//! fn worker() {
//!     loop {
//!         // ...
//!     }
//! }
//!
//! uthreads::init(100_000)?;
//! let id = uthreads::spawn(worker)?;
//! uthreads::block(id)?;
//! uthreads::resume(id)?;
//! uthreads::terminate(uthreads::MAIN_THREAD_ID)?;
//! ```

pub mod config;
pub mod ffi;

use uthreads_core::ThreadEntry;
use uthreads_core::runtime;
use uthreads_lib::klog_error;

pub use config::RuntimeConfig;
pub use uthreads_abi::{
    ErrorClass, MAIN_THREAD_ID, MAX_THREAD_NUM, STACK_SIZE, ThreadError, ThreadId, ThreadResult,
    ThreadState,
};
pub use uthreads_lib::{KlogLevel, PreemptGuard};

/// Log a failed operation, ending the process on fatal classes.
fn report<T>(result: ThreadResult<T>) -> ThreadResult<T> {
    if let Err(err) = &result {
        if err.is_fatal() {
            runtime::fatal(*err);
        }
        klog_error!("thread library error: {}", err);
    }
    result
}

fn validate(id: ThreadId) -> ThreadResult<ThreadId> {
    if id.in_range() {
        Ok(id)
    } else {
        Err(ThreadError::InvalidId)
    }
}

/// Initialize the library with a quantum of `quantum_usecs` microseconds.
///
/// The caller becomes thread 0 and is counted as running its first quantum.
/// Logging verbosity is taken from `UTHREADS_LOG`.
pub fn init(quantum_usecs: i64) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    report(RuntimeConfig::from_env(quantum_usecs).and_then(start))
}

/// Initialize with an explicit configuration.
pub fn init_with(config: RuntimeConfig) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    report(start(config))
}

fn start(config: RuntimeConfig) -> ThreadResult<()> {
    if !runtime::is_initialized() {
        config.apply();
    }
    runtime::init(config.quantum)
}

/// Create a thread running `entry`. Returning from `entry` terminates it.
pub fn spawn(entry: fn()) -> ThreadResult<ThreadId> {
    let _preempt = PreemptGuard::new();
    report(runtime::spawn(ThreadEntry::Rust(entry)))
}

/// Terminate thread `id`.
///
/// Terminating the caller never returns. Terminating thread 0 releases every
/// thread and exits the process with status 0.
pub fn terminate(id: ThreadId) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    report(validate(id).and_then(runtime::terminate))
}

/// Block thread `id` until it is resumed. Blocking the caller yields.
pub fn block(id: ThreadId) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    report(validate(id).and_then(runtime::block))
}

pub fn resume(id: ThreadId) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    report(validate(id).and_then(runtime::resume))
}

/// Suspend the caller until thread `id` terminates.
pub fn sync(id: ThreadId) -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    report(validate(id).and_then(runtime::sync))
}

/// End the caller's quantum early.
pub fn yield_now() -> ThreadResult<()> {
    let _preempt = PreemptGuard::new();
    report(runtime::yield_now())
}

pub fn current_id() -> ThreadResult<ThreadId> {
    let _preempt = PreemptGuard::new();
    report(runtime::current_id())
}

/// Quanta started since `init`, counting the first.
pub fn total_quanta() -> ThreadResult<u64> {
    let _preempt = PreemptGuard::new();
    report(runtime::total_quanta())
}

/// Quanta thread `id` has been running, counting its current one.
pub fn thread_quanta(id: ThreadId) -> ThreadResult<u64> {
    let _preempt = PreemptGuard::new();
    report(validate(id).and_then(runtime::thread_quanta))
}

pub fn thread_state(id: ThreadId) -> ThreadResult<ThreadState> {
    let _preempt = PreemptGuard::new();
    report(validate(id).and_then(runtime::thread_state))
}

pub(crate) fn spawn_c(entry: extern "C" fn()) -> ThreadResult<ThreadId> {
    let _preempt = PreemptGuard::new();
    report(runtime::spawn(ThreadEntry::C(entry)))
}

/// Report a failure detected before reaching the runtime.
pub(crate) fn reject<T>(err: ThreadError) -> ThreadResult<T> {
    report(Err(err))
}

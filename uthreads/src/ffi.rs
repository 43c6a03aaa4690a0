//! C ABI.
//!
//! Each `uthread_*` function mirrors the Rust operation of the same name and
//! returns `-1` on failure, after the failure has been reported on standard
//! error.

use libc::c_int;

use uthreads_abi::{ThreadError, ThreadId, ThreadResult};

const FAILURE: c_int = -1;

fn status(result: ThreadResult<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(_) => FAILURE,
    }
}

fn count(result: ThreadResult<u64>) -> c_int {
    match result {
        Ok(quanta) => c_int::try_from(quanta).unwrap_or(c_int::MAX),
        Err(_) => FAILURE,
    }
}

fn tid(raw: c_int) -> ThreadResult<ThreadId> {
    ThreadId::from_c_int(raw).or_else(crate::reject)
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_init(quantum_usecs: c_int) -> c_int {
    status(crate::init(i64::from(quantum_usecs)))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_spawn(entry: Option<extern "C" fn()>) -> c_int {
    let spawned = match entry {
        Some(entry) => crate::spawn_c(entry),
        None => crate::reject(ThreadError::NullEntry),
    };
    match spawned {
        Ok(id) => id.as_c_int(),
        Err(_) => FAILURE,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_terminate(tid_raw: c_int) -> c_int {
    status(tid(tid_raw).and_then(crate::terminate))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_block(tid_raw: c_int) -> c_int {
    status(tid(tid_raw).and_then(crate::block))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_resume(tid_raw: c_int) -> c_int {
    status(tid(tid_raw).and_then(crate::resume))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_sync(tid_raw: c_int) -> c_int {
    status(tid(tid_raw).and_then(crate::sync))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_yield() -> c_int {
    status(crate::yield_now())
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_get_tid() -> c_int {
    match crate::current_id() {
        Ok(id) => id.as_c_int(),
        Err(_) => FAILURE,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_get_total_quantums() -> c_int {
    count(crate::total_quanta())
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_get_quantums(tid_raw: c_int) -> c_int {
    count(tid(tid_raw).and_then(crate::thread_quanta))
}

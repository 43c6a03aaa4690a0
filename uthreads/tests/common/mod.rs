//! Helpers shared by the scenario binaries.
//!
//! A scenario passes by reaching `finish`, which terminates the main thread
//! and lets the library exit the process with status 0. Any failed check
//! prints its location and exits with status 1.

#![allow(dead_code)]

use std::fmt::Debug;
use std::panic::Location;
use std::process;

use uthreads::{MAIN_THREAD_ID, ThreadId};

/// Long enough that no scenario is preempted unless it spins on purpose.
pub const LONG_QUANTUM_USECS: i64 = 1_000_000;

/// Upper bound on cooperative rounds a scenario waits for progress.
pub const MAX_ROUNDS: usize = 1_000;

#[track_caller]
pub fn check(cond: bool, what: &str) {
    if !cond {
        fail(what);
    }
}

#[track_caller]
pub fn check_eq<T: PartialEq + Debug>(actual: T, expected: T, what: &str) {
    if actual != expected {
        let at = Location::caller();
        eprintln!("FAILED at {at}: {what}: got {actual:?}, expected {expected:?}");
        process::exit(1);
    }
}

#[track_caller]
pub fn fail(what: &str) -> ! {
    let at = Location::caller();
    eprintln!("FAILED at {at}: {what}");
    process::exit(1)
}

/// Yield until `done` holds, failing after [`MAX_ROUNDS`] rounds.
#[track_caller]
pub fn yield_until(done: impl Fn() -> bool, what: &str) {
    for _ in 0..MAX_ROUNDS {
        if done() {
            return;
        }
        if uthreads::yield_now().is_err() {
            fail("yield_now failed");
        }
    }
    if !done() {
        fail(what);
    }
}

pub fn tid(raw: u32) -> ThreadId {
    ThreadId(raw)
}

/// End the scenario successfully.
pub fn finish() -> ! {
    let _ = uthreads::terminate(MAIN_THREAD_ID);
    fail("terminate(0) returned")
}

//! Blocking and resuming other threads and the caller itself.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use common::*;
use uthreads::{ThreadError, ThreadState};

static TICKS: AtomicU32 = AtomicU32::new(0);
static STAGE: AtomicU32 = AtomicU32::new(0);

fn ticker() {
    loop {
        TICKS.fetch_add(1, Ordering::SeqCst);
        let _ = uthreads::yield_now();
    }
}

fn self_blocker() {
    STAGE.store(1, Ordering::SeqCst);
    let me = uthreads::current_id().unwrap();
    if uthreads::block(me).is_err() {
        fail("self block");
    }
    STAGE.store(2, Ordering::SeqCst);
}

fn main() {
    check(uthreads::init(LONG_QUANTUM_USECS).is_ok(), "init");

    let ticker_id = uthreads::spawn(ticker).unwrap();
    check(uthreads::yield_now().is_ok(), "yield");
    check_eq(TICKS.load(Ordering::SeqCst), 1, "ticker ran once");

    check_eq(uthreads::block(ticker_id), Ok(()), "block ticker");
    check_eq(
        uthreads::thread_state(ticker_id),
        Ok(ThreadState::Blocked),
        "ticker blocked",
    );
    check_eq(uthreads::block(ticker_id), Ok(()), "block is idempotent");

    // Nobody else is ready: yielding keeps main running.
    check(uthreads::yield_now().is_ok(), "yield alone");
    check_eq(TICKS.load(Ordering::SeqCst), 1, "blocked ticker stays put");

    check_eq(uthreads::resume(ticker_id), Ok(()), "resume ticker");
    check_eq(
        uthreads::thread_state(ticker_id),
        Ok(ThreadState::Ready),
        "ticker ready",
    );
    check_eq(uthreads::resume(ticker_id), Ok(()), "resume is idempotent");
    check(uthreads::yield_now().is_ok(), "yield");
    check_eq(TICKS.load(Ordering::SeqCst), 2, "resumed ticker runs");

    check_eq(uthreads::resume(tid(0)), Ok(()), "resume running main");
    check_eq(uthreads::block(tid(0)), Err(ThreadError::ReservedId), "block main");
    check_eq(
        uthreads::block(tid(42)),
        Err(ThreadError::NoSuchThread),
        "block unknown",
    );

    let blocker_id = uthreads::spawn(self_blocker).unwrap();
    yield_until(|| STAGE.load(Ordering::SeqCst) == 1, "self blocker started");
    check_eq(
        uthreads::thread_state(blocker_id),
        Ok(ThreadState::Blocked),
        "self blocked",
    );
    check(uthreads::yield_now().is_ok(), "yield past blocked thread");
    check_eq(STAGE.load(Ordering::SeqCst), 1, "still blocked");

    check_eq(uthreads::resume(blocker_id), Ok(()), "resume self blocker");
    yield_until(|| STAGE.load(Ordering::SeqCst) == 2, "self blocker finished");

    finish();
}

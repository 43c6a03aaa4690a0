//! Waiting for another thread to terminate.

mod common;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use common::*;
use uthreads::{ThreadError, ThreadId, ThreadState};

static TARGET: AtomicU32 = AtomicU32::new(0);
static TARGET_ROUNDS: AtomicU32 = AtomicU32::new(0);
static WAITER_SAW_TARGET_GONE: AtomicBool = AtomicBool::new(false);
static WAITER_DONE: AtomicBool = AtomicBool::new(false);
static PARKED_SYNCING: AtomicBool = AtomicBool::new(false);
static PARKED_DONE: AtomicBool = AtomicBool::new(false);

fn target() {
    for _ in 0..3 {
        TARGET_ROUNDS.fetch_add(1, Ordering::SeqCst);
        let _ = uthreads::yield_now();
    }
}

fn waiter() {
    let me = uthreads::current_id().unwrap();
    let target = ThreadId(TARGET.load(Ordering::SeqCst));

    if uthreads::sync(me) != Err(ThreadError::SelfReference) {
        fail("sync on self must fail");
    }
    if uthreads::sync(ThreadId(0)) != Err(ThreadError::ReservedId) {
        fail("sync on main must fail");
    }

    if uthreads::sync(target).is_err() {
        fail("sync on live target");
    }
    let gone = uthreads::thread_state(target) == Err(ThreadError::NoSuchThread);
    WAITER_SAW_TARGET_GONE.store(gone, Ordering::SeqCst);
    if TARGET_ROUNDS.load(Ordering::SeqCst) == 3 {
        WAITER_DONE.store(true, Ordering::SeqCst);
    }
}

fn parked() {
    loop {
        let _ = uthreads::yield_now();
    }
}

fn parked_waiter() {
    let target = ThreadId(TARGET.load(Ordering::SeqCst));
    PARKED_SYNCING.store(true, Ordering::SeqCst);
    if uthreads::sync(target).is_err() {
        fail("sync on parked target");
    }
    PARKED_DONE.store(true, Ordering::SeqCst);
}

fn main() {
    check(uthreads::init(LONG_QUANTUM_USECS).is_ok(), "init");

    let target_id = uthreads::spawn(target).unwrap();
    TARGET.store(target_id.0, Ordering::SeqCst);
    check_eq(
        uthreads::sync(target_id),
        Err(ThreadError::MainThreadSync),
        "main cannot sync",
    );
    check_eq(
        uthreads::sync(tid(77)),
        Err(ThreadError::NoSuchThread),
        "sync on unknown",
    );

    let waiter_id = uthreads::spawn(waiter).unwrap();
    yield_until(|| WAITER_DONE.load(Ordering::SeqCst), "waiter released");
    check(
        WAITER_SAW_TARGET_GONE.load(Ordering::SeqCst),
        "target reclaimed before waiter resumed",
    );
    yield_until(
        || uthreads::thread_state(waiter_id).is_err(),
        "waiter finished",
    );

    // Release by third-party termination, with the target blocked.
    let parked_id = uthreads::spawn(parked).unwrap();
    TARGET.store(parked_id.0, Ordering::SeqCst);
    let parked_waiter_id = uthreads::spawn(parked_waiter).unwrap();
    yield_until(|| PARKED_SYNCING.load(Ordering::SeqCst), "parked waiter syncing");
    // Sync-waiting threads are Ready but off the queue.
    check_eq(
        uthreads::thread_state(parked_waiter_id),
        Ok(ThreadState::Ready),
        "waiter state",
    );
    check_eq(uthreads::block(parked_id), Ok(()), "block target");
    check_eq(uthreads::terminate(parked_id), Ok(()), "terminate target");
    yield_until(|| PARKED_DONE.load(Ordering::SeqCst), "parked waiter released");

    finish();
}

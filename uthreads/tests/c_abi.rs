//! The `uthread_*` C entry points.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use common::*;
use uthreads::ffi::*;

static HITS: AtomicU32 = AtomicU32::new(0);

extern "C" fn c_worker() {
    HITS.fetch_add(1, Ordering::SeqCst);
}

fn main() {
    check_eq(uthread_get_tid(), -1, "tid before init");
    check_eq(uthread_init(0), -1, "zero quantum");
    check_eq(uthread_init(1_000_000), 0, "init");
    check_eq(uthread_init(1_000_000), -1, "second init");

    check_eq(uthread_get_tid(), 0, "main tid");
    check_eq(uthread_get_total_quantums(), 1, "first quantum");
    check_eq(uthread_get_quantums(0), 1, "main quanta");

    check_eq(uthread_spawn(Some(c_worker)), 1, "spawn");
    check_eq(uthread_spawn(None), -1, "null entry");
    check_eq(uthread_get_quantums(1), 0, "not yet run");
    check_eq(uthread_get_quantums(-1), -1, "negative id");
    check_eq(uthread_get_quantums(100), -1, "id past range");

    check_eq(uthread_block(0), -1, "block main");
    check_eq(uthread_sync(1), -1, "main cannot sync");
    check_eq(uthread_resume(1), 0, "resume ready thread");

    check_eq(uthread_yield(), 0, "yield");
    check_eq(HITS.load(Ordering::SeqCst), 1, "worker ran");
    check_eq(uthread_get_quantums(1), -1, "worker reclaimed");
    check_eq(uthread_get_total_quantums(), 3, "quanta after worker exit");

    check_eq(uthread_spawn(Some(c_worker)), 1, "respawn");
    check_eq(uthread_block(1), 0, "block");
    check_eq(uthread_terminate(1), 0, "terminate blocked");
    check_eq(uthread_terminate(1), -1, "terminate twice");

    uthread_terminate(0);
    fail("uthread_terminate(0) returned");
}

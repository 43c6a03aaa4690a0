//! Context switch primitive tests.
//!
//! These run real switches between the test thread's stack and a heap stack,
//! without the scheduler or any signals involved.

use core::sync::atomic::{AtomicU32, Ordering};

use uthreads_abi::STACK_SIZE;

use super::stack::ThreadStack;
use super::switch_context::{ExecutionContext, switch};

static mut HOST: ExecutionContext = ExecutionContext::zero();
static mut GUEST: ExecutionContext = ExecutionContext::zero();
static ROUNDS: AtomicU32 = AtomicU32::new(0);
static GUEST_SP_OK: AtomicU32 = AtomicU32::new(0);

extern "C" fn ping_pong_guest() -> ! {
    let marker = 0u8;
    let here = (&raw const marker) as usize;
    // SAFETY: GUEST is only written before the first switch into it.
    if here < unsafe { (*&raw const GUEST).stack_pointer() } {
        GUEST_SP_OK.store(1, Ordering::SeqCst);
    }
    loop {
        ROUNDS.fetch_add(1, Ordering::SeqCst);
        // SAFETY: HOST was saved by the switch that resumed us.
        unsafe { switch(&raw mut GUEST, &raw const HOST) };
    }
}

#[test]
fn switch_runs_seeded_entry_and_returns_to_saver() {
    let stack = ThreadStack::allocate(STACK_SIZE).unwrap();
    // SAFETY: no switch is in flight; this test is the only user of the slots.
    unsafe {
        GUEST = ExecutionContext::seeded(stack.top(), ping_pong_guest);
    }

    let mut preserved = 0x5eed_u64;
    for expected in 1..=3 {
        // SAFETY: GUEST is seeded or saved on a live stack.
        unsafe { switch(&raw mut HOST, &raw const GUEST) };
        assert_eq!(ROUNDS.load(Ordering::SeqCst), expected);
        preserved = preserved.wrapping_mul(3);
    }

    assert_eq!(preserved, 0x5eed_u64 * 27);
    assert_eq!(GUEST_SP_OK.load(Ordering::SeqCst), 1);
    // SAFETY: the guest is parked inside its switch call.
    let parked = unsafe { (*&raw const GUEST).stack_pointer() };
    assert!(stack.contains(parked));
}

#[test]
fn seeded_context_is_aligned_and_clean() {
    let stack = ThreadStack::allocate(STACK_SIZE).unwrap();
    let ctx = ExecutionContext::seeded(stack.top() + 7, ping_pong_guest);
    assert_eq!(ctx.stack_pointer() % 16, 0);
    assert!(ctx.stack_pointer() <= stack.top() + 7);
    assert_ne!(ctx.resume_address(), 0);
}

#[cfg(target_arch = "x86_64")]
#[test]
fn seeded_context_has_default_fpu_state() {
    use super::switch_context::{ContextEntry, FPU_CW_DEFAULT, MXCSR_DEFAULT};

    let stack = ThreadStack::allocate(STACK_SIZE).unwrap();
    let ctx = ExecutionContext::seeded(stack.top(), ping_pong_guest);
    assert_eq!(ctx.mxcsr, MXCSR_DEFAULT);
    assert_eq!(ctx.fpu_cw, FPU_CW_DEFAULT);
    assert_eq!(ctx.r12, ping_pong_guest as ContextEntry as usize as u64);
}

#![allow(unsafe_op_in_unsafe_fn)]

//! FFI Boundary Layer for Scheduler
//!
//! This module contains ONLY functions that require `extern "C"` linkage because they are:
//! 1. Entered from assembly (the context entry trampoline calls them)
//! 2. Defined in assembly and called from Rust
//!
//! All other Rust-to-Rust calls use regular Rust functions without extern "C".

use super::switch_context::ExecutionContext;

// ============================================================================
// Functions entered FROM assembly (must be extern "C")
// ============================================================================

/// First frame of every spawned thread.
///
/// Runs on the thread's own stack. A panic escaping the entry function cannot
/// unwind through this frame and aborts the process.
pub extern "C" fn thread_start() -> ! {
    super::runtime::thread_start_impl()
}

/// First frame of the reaper, running on the auxiliary stack after a thread
/// terminated itself or the main thread shut the library down.
pub extern "C" fn reaper_start() -> ! {
    super::runtime::reaper_start_impl()
}

// ============================================================================
// Functions defined IN assembly (must be declared as extern "C")
// ============================================================================

// The assembly in switch_context.rs exports uthreads_context_switch and
// uthreads_context_entry.
unsafe extern "C" {
    #[link_name = "uthreads_context_switch"]
    fn context_switch_impl(save_into: *mut ExecutionContext, resume_from: *const ExecutionContext);
    #[link_name = "uthreads_context_entry"]
    fn context_entry_impl();
}

pub unsafe fn context_switch(save_into: *mut ExecutionContext, resume_from: *const ExecutionContext) {
    context_switch_impl(save_into, resume_from);
}

pub fn context_entry_address() -> usize {
    context_entry_impl as unsafe extern "C" fn() as usize
}

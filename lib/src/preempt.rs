//! Preemption control for uthreads.
//!
//! Preemption is delivered as [`PREEMPT_SIGNAL`]; disabling preemption means
//! masking that signal for the native thread. RAII guards keep the mask in
//! place for the guard's lifetime and restore the previous mask on drop, so
//! guards nest and survive a context switch: a thread that resumes inside a
//! guarded section drops its own guard when it leaves that section.

use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr;

use libc::c_int;

pub const PREEMPT_SIGNAL: c_int = libc::SIGVTALRM;

fn preempt_sigset() -> libc::sigset_t {
    let mut set = MaybeUninit::<libc::sigset_t>::uninit();
    // SAFETY: sigemptyset initializes the set before sigaddset reads it.
    unsafe {
        libc::sigemptyset(set.as_mut_ptr());
        libc::sigaddset(set.as_mut_ptr(), PREEMPT_SIGNAL);
        set.assume_init()
    }
}

/// Apply `how` to the preemption signal and report whether it was masked before.
fn change_mask(how: c_int) -> bool {
    let set = preempt_sigset();
    let mut old = MaybeUninit::<libc::sigset_t>::uninit();
    // SAFETY: both sets are valid for the duration of the call.
    unsafe {
        let rc = libc::pthread_sigmask(how, &set, old.as_mut_ptr());
        debug_assert_eq!(rc, 0, "pthread_sigmask failed");
        libc::sigismember(old.as_ptr(), PREEMPT_SIGNAL) == 1
    }
}

/// RAII guard that disables preemption while held.
/// !Send/!Sync: the signal mask belongs to the native thread.
#[must_use = "if unused, preemption will be immediately re-enabled"]
pub struct PreemptGuard {
    was_masked: bool,
    _marker: PhantomData<*mut ()>,
}

impl PreemptGuard {
    #[inline]
    pub fn new() -> Self {
        Self {
            was_masked: change_mask(libc::SIG_BLOCK),
            _marker: PhantomData,
        }
    }

    /// Whether preemption was already disabled when this guard was taken.
    #[inline]
    pub fn was_nested(&self) -> bool {
        self.was_masked
    }
}

impl Default for PreemptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PreemptGuard {
    #[inline]
    fn drop(&mut self) {
        if !self.was_masked {
            change_mask(libc::SIG_UNBLOCK);
        }
    }
}

/// Unconditionally re-enable preemption.
///
/// Used where no guard exists to drop: a freshly started thread begins running
/// with the mask its creator's switch left behind.
#[inline]
pub fn enable_preemption() {
    change_mask(libc::SIG_UNBLOCK);
}

#[inline]
pub fn is_preemption_disabled() -> bool {
    let mut current = MaybeUninit::<libc::sigset_t>::uninit();
    // SAFETY: a null `set` only queries the current mask.
    unsafe {
        libc::pthread_sigmask(libc::SIG_BLOCK, ptr::null(), current.as_mut_ptr());
        libc::sigismember(current.as_ptr(), PREEMPT_SIGNAL) == 1
    }
}

/// Consume an expiry that arrived while preemption was disabled.
///
/// Returns whether one was pending. Call with preemption disabled; an unmasked
/// signal is delivered rather than left pending.
pub fn discard_pending_preemption() -> bool {
    let mut pending = MaybeUninit::<libc::sigset_t>::uninit();
    // SAFETY: sigpending fills the set before sigismember reads it.
    let is_pending = unsafe {
        libc::sigpending(pending.as_mut_ptr()) == 0
            && libc::sigismember(pending.as_ptr(), PREEMPT_SIGNAL) == 1
    };
    if !is_pending {
        return false;
    }

    let set = preempt_sigset();
    let no_wait = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: the set and timeout are valid; no siginfo is requested.
    unsafe { libc::sigtimedwait(&set, ptr::null_mut(), &no_wait) == PREEMPT_SIGNAL }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_nest_and_restore() {
        enable_preemption();
        {
            let outer = PreemptGuard::new();
            assert!(!outer.was_nested());
            assert!(is_preemption_disabled());
            {
                let inner = PreemptGuard::new();
                assert!(inner.was_nested());
            }
            assert!(is_preemption_disabled());
        }
        assert!(!is_preemption_disabled());
    }

    #[test]
    fn masked_expiry_is_discarded() {
        let _guard = PreemptGuard::new();
        assert!(!discard_pending_preemption());
        // SAFETY: the signal is masked on this thread, so it stays pending.
        assert_eq!(unsafe { libc::raise(PREEMPT_SIGNAL) }, 0);
        assert!(discard_pending_preemption());
        assert!(!discard_pending_preemption());
    }
}

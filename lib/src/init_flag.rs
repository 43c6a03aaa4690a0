//! One-shot initialization gate.
//!
//! A caller claims the gate, performs its setup, and completes the claim.
//! Dropping a claim without completing it reopens the gate, so a failed setup
//! returned through `?` can be retried.
//!
//! ```ignore
//! static SUBSYSTEM_INIT: InitFlag = InitFlag::new();
//!
//! pub fn init() -> ThreadResult<()> {
//!     let claim = SUBSYSTEM_INIT.claim().ok_or(ThreadError::AlreadyInitialized)?;
//!     fallible_setup()?;
//!     claim.complete();
//!     Ok(())
//! }
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const CLAIMED: u8 = 1;
const DONE: u8 = 2;

pub struct InitFlag {
    state: AtomicU8,
}

impl InitFlag {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Take the right to initialize. `None` once a claim is pending or done.
    pub fn claim(&self) -> Option<InitClaim<'_>> {
        self.state
            .compare_exchange(IDLE, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InitClaim {
                flag: self,
                completed: false,
            })
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }
}

impl Default for InitFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use = "dropping the claim reopens the gate"]
pub struct InitClaim<'a> {
    flag: &'a InitFlag,
    completed: bool,
}

impl InitClaim<'_> {
    pub fn complete(mut self) {
        self.flag.state.store(DONE, Ordering::Release);
        self.completed = true;
    }
}

impl Drop for InitClaim<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.flag.state.store(IDLE, Ordering::Release);
        }
    }
}

//! Thread-related types and constants shared between the uthreads crates.

use core::fmt;

use crate::error::{ThreadError, ThreadResult};

// =============================================================================
// Thread Configuration Constants
// =============================================================================

pub const MAX_THREAD_NUM: usize = 100;
pub const STACK_SIZE: usize = 0x20000; // 128KB
pub const REAPER_STACK_SIZE: usize = STACK_SIZE;
pub const MAIN_THREAD_ID: ThreadId = ThreadId(0);
pub const MICROS_PER_SEC: u32 = 1_000_000;

// =============================================================================
// ThreadId
// =============================================================================

/// Identifier of a logical thread. Valid identifiers live in `[0, MAX_THREAD_NUM)`.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u32);

impl ThreadId {
    /// Validate a raw C identifier.
    pub fn from_c_int(raw: i32) -> ThreadResult<Self> {
        if raw < 0 {
            return Err(ThreadError::InvalidId);
        }
        let id = Self(raw as u32);
        if !id.in_range() {
            return Err(ThreadError::InvalidId);
        }
        Ok(id)
    }

    #[inline]
    pub const fn in_range(self) -> bool {
        (self.0 as usize) < MAX_THREAD_NUM
    }

    #[inline]
    pub const fn is_main(self) -> bool {
        self.0 == MAIN_THREAD_ID.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn as_c_int(self) -> i32 {
        self.0 as i32
    }
}

impl From<usize> for ThreadId {
    fn from(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// ThreadState
// =============================================================================

/// Scheduling state of a live thread. Terminated threads have no state; their
/// slot is simply empty.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadState {
    Ready = 0,
    Running = 1,
    Blocked = 2,
}

impl ThreadState {
    #[inline]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    #[inline]
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "READY"),
            Self::Running => write!(f, "RUNNING"),
            Self::Blocked => write!(f, "BLOCKED"),
        }
    }
}

// =============================================================================
// Quantum
// =============================================================================

/// Length of one scheduling quantum, split the way `setitimer` wants it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quantum {
    pub secs: u32,
    pub usecs: u32,
}

impl Quantum {
    pub fn from_micros(quantum_usecs: i64) -> ThreadResult<Self> {
        if quantum_usecs <= 0 || quantum_usecs > u32::MAX as i64 {
            return Err(ThreadError::InvalidQuantum);
        }
        let micros = quantum_usecs as u32;
        Ok(Self {
            secs: micros / MICROS_PER_SEC,
            usecs: micros % MICROS_PER_SEC,
        })
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.secs as u64 * MICROS_PER_SEC as u64 + self.usecs as u64
    }
}

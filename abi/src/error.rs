//! Error types for the thread library

use core::ffi::c_int;
use core::fmt;

/// Implement the C-int conversions for thread library error enums.
///
/// Generates `as_c_int()` and `from_c_int()` for `#[repr(i32)]` error enums that
/// follow the library's negative error-code convention.
macro_rules! impl_thread_error {
    ($ty:ty, fallback: $fallback:ident, variants: { $($val:literal => $variant:ident),* $(,)? }) => {
        impl $ty {
            /// Convert to C-style integer for the `uthread_*` ABI.
            #[inline]
            pub fn as_c_int(self) -> c_int {
                self as c_int
            }

            /// Convert from C-style integer.
            #[inline]
            pub fn from_c_int(val: c_int) -> Self {
                match val {
                    $($val => Self::$variant,)*
                    _ => Self::$fallback,
                }
            }
        }
    };
}

/// Thread library result type
pub type ThreadResult<T> = Result<T, ThreadError>;

/// Broad category of a [`ThreadError`], deciding how the facade reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad identifier, reserved identifier, self reference or bad quantum.
    InvalidArgument,
    /// Identifier in range but no thread occupies the slot.
    NotFound,
    /// Thread table is full.
    Capacity,
    /// Stack or signal setup failed; the library cannot continue.
    Resource,
    /// A switch was required but no thread can run.
    Protocol,
}

/// Errors returned by thread library operations
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadError {
    /// Identifier outside `[0, MAX_THREAD_NUM)`
    InvalidId = -1,
    /// The main thread cannot be the target of this operation
    ReservedId = -2,
    /// A thread cannot sync on itself
    SelfReference = -3,
    /// The main thread cannot wait on another thread
    MainThreadSync = -4,
    /// Quantum length must be positive
    InvalidQuantum = -5,
    /// `init` was already called
    AlreadyInitialized = -6,
    /// Operation issued before `init`
    NotInitialized = -7,
    /// No thread occupies the slot
    NoSuchThread = -8,
    /// Thread table is at capacity
    CapacityReached = -9,
    /// Stack allocation failed
    StackAllocation = -10,
    /// Installing the preemption handler failed
    SignalSetup = -11,
    /// Scheduling decision required with an empty ready queue
    NoRunnableThread = -12,
    /// Null entry point passed through the C ABI
    NullEntry = -13,
}

impl_thread_error!(ThreadError, fallback: InvalidId, variants: {
    -1 => InvalidId,
    -2 => ReservedId,
    -3 => SelfReference,
    -4 => MainThreadSync,
    -5 => InvalidQuantum,
    -6 => AlreadyInitialized,
    -7 => NotInitialized,
    -8 => NoSuchThread,
    -9 => CapacityReached,
    -10 => StackAllocation,
    -11 => SignalSetup,
    -12 => NoRunnableThread,
    -13 => NullEntry,
});

impl ThreadError {
    pub fn class(self) -> ErrorClass {
        match self {
            Self::InvalidId
            | Self::ReservedId
            | Self::SelfReference
            | Self::MainThreadSync
            | Self::InvalidQuantum
            | Self::AlreadyInitialized
            | Self::NotInitialized
            | Self::NullEntry => ErrorClass::InvalidArgument,
            Self::NoSuchThread => ErrorClass::NotFound,
            Self::CapacityReached => ErrorClass::Capacity,
            Self::StackAllocation | Self::SignalSetup => ErrorClass::Resource,
            Self::NoRunnableThread => ErrorClass::Protocol,
        }
    }

    /// Fatal errors terminate the process after being reported.
    #[inline]
    pub fn is_fatal(self) -> bool {
        matches!(self.class(), ErrorClass::Resource | ErrorClass::Protocol)
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidId => "thread id out of range",
            Self::ReservedId => "operation not allowed on the main thread",
            Self::SelfReference => "a thread cannot sync on itself",
            Self::MainThreadSync => "the main thread cannot sync",
            Self::InvalidQuantum => "quantum length must be positive",
            Self::AlreadyInitialized => "library already initialized",
            Self::NotInitialized => "library not initialized",
            Self::NoSuchThread => "thread id non existent",
            Self::CapacityReached => "maximum number of threads reached",
            Self::StackAllocation => "thread stack allocation failed",
            Self::SignalSetup => "sigaction error",
            Self::NoRunnableThread => "no thread is ready to run",
            Self::NullEntry => "thread entry point is null",
        }
    }
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_int_conversion_is_lossless() {
        for code in -13..=-1 {
            assert_eq!(ThreadError::from_c_int(code).as_c_int(), code);
        }
        assert_eq!(ThreadError::from_c_int(42), ThreadError::InvalidId);
    }

    #[test]
    fn fatal_errors_are_resource_or_protocol() {
        assert!(ThreadError::StackAllocation.is_fatal());
        assert!(ThreadError::NoRunnableThread.is_fatal());
        assert!(!ThreadError::NoSuchThread.is_fatal());
        assert_eq!(ThreadError::CapacityReached.class(), ErrorClass::Capacity);
    }
}

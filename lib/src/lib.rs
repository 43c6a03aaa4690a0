//! Support library for uthreads: logging, preemption masking and the
//! preemption-safe lock used around scheduler state.

pub mod init_flag;
pub mod klog;
pub mod preempt;
pub mod spinlock;

pub use init_flag::{InitClaim, InitFlag};
pub use klog::KlogLevel;
pub use preempt::{PREEMPT_SIGNAL, PreemptGuard, discard_pending_preemption};
pub use spinlock::{PreemptMutex, PreemptMutexGuard};

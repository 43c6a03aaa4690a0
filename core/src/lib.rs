//! Scheduler core for uthreads: execution contexts, thread records, the ready
//! queue, the round-robin state machine and the process-wide runtime that
//! drives it from the virtual interval timer.

pub mod scheduler;

pub use scheduler::ffi_boundary;
pub use scheduler::runtime;
pub use scheduler::scheduler as sched;
pub use scheduler::switch_context;

pub use scheduler::scheduler::{EntryPoints, ReapOutcome, Scheduler, SwitchPlan, Termination};
pub use scheduler::stack::ThreadStack;
pub use scheduler::switch_context::{ContextEntry, ExecutionContext};
pub use scheduler::thread::{LogicalThread, ThreadEntry};
pub use scheduler::timer::VirtualTimer;

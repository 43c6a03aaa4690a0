pub mod ffi_boundary;
pub mod ready_queue;
pub mod runtime;
#[allow(clippy::module_inception)]
pub mod scheduler;
pub mod stack;
pub mod switch_context;
pub mod table;
pub mod thread;
pub mod timer;

#[cfg(test)]
mod context_tests;

//! uthreads shared types
//!
//! This crate provides the canonical definitions shared by the scheduler core,
//! the support library and the public facade. Having a single source of truth
//! keeps identifiers, states and error codes consistent between the Rust API and
//! the C ABI.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod error;
pub mod sched_traits;
pub mod task;

pub use error::*;
pub use sched_traits::*;
pub use task::*;

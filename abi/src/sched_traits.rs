//! Scheduler trait interfaces.
//!
//! Defined in `abi` so the scheduler core can be driven by the real interval
//! timer in production and by a recording timer in unit tests.

use crate::task::Quantum;

/// Source of quantum-boundary interrupts.
///
/// The scheduler disarms the timer at the start of every switch decision and
/// re-arms it once a consistent state is reached, so preemption can only take
/// effect between quanta.
pub trait QuantumTimer {
    /// Start (or restart) a periodic timer of length `quantum`.
    fn arm(&mut self, quantum: Quantum);

    /// Stop the timer. Pending expirations are discarded.
    fn disarm(&mut self);
}

//! Virtual interval timer driving preemption.
//!
//! `ITIMER_VIRTUAL` counts CPU time consumed by the process in user mode, so a
//! thread sleeping in a system call does not burn its quantum.

use core::mem;
use core::ptr;

use libc::c_int;

use uthreads_abi::{Quantum, QuantumTimer, ThreadError, ThreadResult};
use uthreads_lib::{PREEMPT_SIGNAL, discard_pending_preemption, klog_error};

/// Handler invoked with `PREEMPT_SIGNAL` masked.
pub type PreemptHandler = extern "C" fn(c_int);

#[derive(Debug, Default)]
pub struct VirtualTimer {
    armed: bool,
}

impl VirtualTimer {
    pub const fn new() -> Self {
        Self { armed: false }
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn program(&mut self, interval: libc::timeval) {
        let spec = libc::itimerval {
            it_interval: interval,
            it_value: interval,
        };
        // SAFETY: `spec` is a valid itimerval and the old value is not requested.
        let rc = unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &spec, ptr::null_mut()) };
        if rc != 0 {
            klog_error!("system error: setitimer failed");
        }
    }
}

impl QuantumTimer for VirtualTimer {
    fn arm(&mut self, quantum: Quantum) {
        self.program(libc::timeval {
            tv_sec: quantum.secs as libc::time_t,
            tv_usec: quantum.usecs as libc::suseconds_t,
        });
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.program(libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        });
        // An expiry raised while the caller held preemption off belongs to the
        // quantum that is ending.
        discard_pending_preemption();
        self.armed = false;
    }
}

/// Route `PREEMPT_SIGNAL` to `handler`.
///
/// The signal is masked while the handler runs and interrupted system calls
/// are restarted.
pub fn install_handler(handler: PreemptHandler) -> ThreadResult<()> {
    // SAFETY: an all-zero sigaction is a valid starting point on Linux.
    let mut action: libc::sigaction = unsafe { mem::zeroed() };
    action.sa_sigaction = handler as libc::sighandler_t;
    action.sa_flags = libc::SA_RESTART;

    // SAFETY: sa_mask is owned by `action`; sigaction copies the struct.
    let rc = unsafe {
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaddset(&mut action.sa_mask, PREEMPT_SIGNAL);
        libc::sigaction(PREEMPT_SIGNAL, &action, ptr::null_mut())
    };
    if rc < 0 {
        return Err(ThreadError::SignalSetup);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uthreads_lib::PreemptGuard;

    #[test]
    fn disarm_drops_expiry_raised_while_masked() {
        let _guard = PreemptGuard::new();
        let mut timer = VirtualTimer::new();

        // SAFETY: the signal is masked on this thread, so it stays pending.
        assert_eq!(unsafe { libc::raise(PREEMPT_SIGNAL) }, 0);
        timer.disarm();
        assert!(!timer.is_armed());
        assert!(!discard_pending_preemption());
    }
}

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::preempt::PreemptGuard;

/// Mutex that masks the preemption signal while held.
///
/// Scheduler state is touched both from ordinary calls and from the preemption
/// handler; holding this lock guarantees the handler cannot run in between.
/// The lock must be released before any context switch.
pub struct PreemptMutex<T> {
    lock: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: PreemptMutex provides exclusive access through atomic locking with
// preemption masked, making it safe to share across contexts.
unsafe impl<T: Send> Send for PreemptMutex<T> {}
unsafe impl<T: Send> Sync for PreemptMutex<T> {}

pub struct PreemptMutexGuard<'a, T> {
    mutex: &'a PreemptMutex<T>,
    _preempt: PreemptGuard,
}

impl<T> PreemptMutex<T> {
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            lock: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    #[inline]
    pub fn lock(&self) -> PreemptMutexGuard<'_, T> {
        let preempt = PreemptGuard::new();

        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }

        PreemptMutexGuard {
            mutex: self,
            _preempt: preempt,
        }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<PreemptMutexGuard<'_, T>> {
        let preempt = PreemptGuard::new();

        if self
            .lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(PreemptMutexGuard {
                mutex: self,
                _preempt: preempt,
            })
        } else {
            drop(preempt);
            None
        }
    }
}

impl<'a, T> Deref for PreemptMutexGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> DerefMut for PreemptMutexGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T> Drop for PreemptMutexGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.mutex.lock.store(false, Ordering::Release);
        // _preempt drops after this, restoring the previous signal mask
    }
}

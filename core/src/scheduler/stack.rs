use core::fmt;
use core::ptr::{self, NonNull};

use uthreads_abi::{ThreadError, ThreadResult};

/// Heap-allocated execution stack owned by exactly one thread (or the reaper).
///
/// The memory is handed out as a raw region because it is written by code
/// running on it, never through Rust references. Dropping the stack frees it,
/// so a stack is released exactly once, when its owner is reclaimed.
pub struct ThreadStack {
    base: NonNull<u8>,
    size: usize,
}

// SAFETY: the region is uniquely owned; only the thread running on it touches
// its contents, and the scheduler lock serialises ownership changes.
unsafe impl Send for ThreadStack {}

impl ThreadStack {
    pub fn allocate(size: usize) -> ThreadResult<Self> {
        let mut memory: Vec<u8> = Vec::new();
        memory
            .try_reserve_exact(size)
            .map_err(|_| ThreadError::StackAllocation)?;
        memory.resize(size, 0);
        let region = Box::leak(memory.into_boxed_slice());
        Ok(Self {
            base: NonNull::from(region).cast::<u8>(),
            size,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Highest 16-byte aligned address inside the region.
    #[inline]
    pub fn top(&self) -> usize {
        (self.base() + self.size) & !0xF
    }

    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base() && addr <= self.base() + self.size
    }
}

impl Drop for ThreadStack {
    fn drop(&mut self) {
        // SAFETY: base/size describe the boxed slice leaked in `allocate`.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                self.base.as_ptr(),
                self.size,
            )));
        }
    }
}

impl fmt::Debug for ThreadStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadStack")
            .field("base", &format_args!("{:#x}", self.base()))
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uthreads_abi::STACK_SIZE;

    #[test]
    fn top_is_aligned_and_inside() {
        let stack = ThreadStack::allocate(STACK_SIZE).unwrap();
        assert_eq!(stack.top() % 16, 0);
        assert!(stack.contains(stack.top()));
        assert!(stack.top() > stack.base());
        assert_eq!(stack.size(), STACK_SIZE);
    }

    #[test]
    fn absurd_size_fails_cleanly() {
        assert_eq!(
            ThreadStack::allocate(usize::MAX).unwrap_err(),
            ThreadError::StackAllocation
        );
    }
}

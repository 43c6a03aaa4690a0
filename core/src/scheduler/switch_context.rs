//! Execution context save/restore primitive.
//!
//! An [`ExecutionContext`] holds exactly the state a cooperative switch has to
//! preserve under the platform C ABI: callee-saved registers, stack pointer,
//! resume address and floating-point control state. Caller-saved registers are
//! dead across the `extern "C"` call into the switch routine, so they are not
//! recorded. The signal mask is not part of the context; preemption masking is
//! carried by `PreemptGuard` on each thread's own stack.
//!
//! Saving is expressed as "switch returns when resumed": the routine stores the
//! caller's state into one context and loads another, and the caller observes
//! a normal return the next time something switches back into the saved slot.

use core::arch::global_asm;
use core::mem::offset_of;

use static_assertions::const_assert_eq;

/// Entry point for a freshly seeded context. It runs on the new stack and must
/// never return.
pub type ContextEntry = extern "C" fn() -> !;

// =============================================================================
// x86_64
// =============================================================================

#[cfg(target_arch = "x86_64")]
pub const MXCSR_DEFAULT: u32 = 0x1F80;
#[cfg(target_arch = "x86_64")]
pub const FPU_CW_DEFAULT: u16 = 0x037F;

#[cfg(target_arch = "x86_64")]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub rbx: u64,
    pub rbp: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub rsp: u64,
    pub rip: u64,
    pub mxcsr: u32,
    pub fpu_cw: u16,
    pad: u16,
}

#[cfg(target_arch = "x86_64")]
impl ExecutionContext {
    pub const fn zero() -> Self {
        Self {
            rbx: 0,
            rbp: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            rsp: 0,
            rip: 0,
            mxcsr: 0,
            fpu_cw: 0,
            pad: 0,
        }
    }

    /// Context that starts `entry` on the stack ending at `stack_top`.
    ///
    /// The entry trampoline receives `entry` in r12 and calls it with the
    /// stack aligned as the ABI expects at a call site.
    pub fn seeded(stack_top: usize, entry: ContextEntry) -> Self {
        Self {
            rsp: (stack_top & !0xF) as u64,
            rip: super::ffi_boundary::context_entry_address() as u64,
            r12: entry as usize as u64,
            mxcsr: MXCSR_DEFAULT,
            fpu_cw: FPU_CW_DEFAULT,
            ..Self::zero()
        }
    }

    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.rsp as usize
    }

    #[inline]
    pub fn resume_address(&self) -> usize {
        self.rip as usize
    }
}

#[cfg(target_arch = "x86_64")]
pub const OFF_RBX: usize = offset_of!(ExecutionContext, rbx);
#[cfg(target_arch = "x86_64")]
pub const OFF_RBP: usize = offset_of!(ExecutionContext, rbp);
#[cfg(target_arch = "x86_64")]
pub const OFF_R12: usize = offset_of!(ExecutionContext, r12);
#[cfg(target_arch = "x86_64")]
pub const OFF_R13: usize = offset_of!(ExecutionContext, r13);
#[cfg(target_arch = "x86_64")]
pub const OFF_R14: usize = offset_of!(ExecutionContext, r14);
#[cfg(target_arch = "x86_64")]
pub const OFF_R15: usize = offset_of!(ExecutionContext, r15);
#[cfg(target_arch = "x86_64")]
pub const OFF_RSP: usize = offset_of!(ExecutionContext, rsp);
#[cfg(target_arch = "x86_64")]
pub const OFF_RIP: usize = offset_of!(ExecutionContext, rip);
#[cfg(target_arch = "x86_64")]
pub const OFF_MXCSR: usize = offset_of!(ExecutionContext, mxcsr);
#[cfg(target_arch = "x86_64")]
pub const OFF_FPU_CW: usize = offset_of!(ExecutionContext, fpu_cw);

#[cfg(target_arch = "x86_64")]
const_assert_eq!(OFF_RSP, 0x30);
#[cfg(target_arch = "x86_64")]
const_assert_eq!(OFF_RIP, 0x38);
#[cfg(target_arch = "x86_64")]
const_assert_eq!(OFF_MXCSR, 0x40);
#[cfg(target_arch = "x86_64")]
const_assert_eq!(OFF_FPU_CW, 0x44);

// uthreads_context_switch(save_into: rdi, resume_from: rsi)
//
// The return address at [rsp] becomes the saved resume address and the
// post-return stack pointer becomes the saved rsp, so resuming the slot looks
// exactly like this call returning.
#[cfg(target_arch = "x86_64")]
global_asm!(
    ".text",
    ".global uthreads_context_switch",
    ".type uthreads_context_switch, @function",
    ".p2align 4",
    "uthreads_context_switch:",
    "    mov rax, [rsp]",
    "    lea rcx, [rsp + 8]",
    "    mov [rdi + {rbx}], rbx",
    "    mov [rdi + {rbp}], rbp",
    "    mov [rdi + {r12}], r12",
    "    mov [rdi + {r13}], r13",
    "    mov [rdi + {r14}], r14",
    "    mov [rdi + {r15}], r15",
    "    mov [rdi + {rsp}], rcx",
    "    mov [rdi + {rip}], rax",
    "    stmxcsr dword ptr [rdi + {mxcsr}]",
    "    fnstcw word ptr [rdi + {fpu_cw}]",
    "    mov rbx, [rsi + {rbx}]",
    "    mov rbp, [rsi + {rbp}]",
    "    mov r12, [rsi + {r12}]",
    "    mov r13, [rsi + {r13}]",
    "    mov r14, [rsi + {r14}]",
    "    mov r15, [rsi + {r15}]",
    "    ldmxcsr dword ptr [rsi + {mxcsr}]",
    "    fldcw word ptr [rsi + {fpu_cw}]",
    "    mov rsp, [rsi + {rsp}]",
    "    jmp qword ptr [rsi + {rip}]",
    ".size uthreads_context_switch, . - uthreads_context_switch",
    "",
    ".global uthreads_context_entry",
    ".type uthreads_context_entry, @function",
    ".p2align 4",
    "uthreads_context_entry:",
    "    xor ebp, ebp",
    "    call r12",
    "    ud2",
    ".size uthreads_context_entry, . - uthreads_context_entry",
    rbx = const OFF_RBX,
    rbp = const OFF_RBP,
    r12 = const OFF_R12,
    r13 = const OFF_R13,
    r14 = const OFF_R14,
    r15 = const OFF_R15,
    rsp = const OFF_RSP,
    rip = const OFF_RIP,
    mxcsr = const OFF_MXCSR,
    fpu_cw = const OFF_FPU_CW,
);

// =============================================================================
// aarch64
// =============================================================================

#[cfg(target_arch = "aarch64")]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// x19..=x28
    pub x: [u64; 10],
    pub fp: u64,
    pub lr: u64,
    pub sp: u64,
    /// Low halves of v8..=v15.
    pub d: [u64; 8],
}

#[cfg(target_arch = "aarch64")]
impl ExecutionContext {
    pub const fn zero() -> Self {
        Self {
            x: [0; 10],
            fp: 0,
            lr: 0,
            sp: 0,
            d: [0; 8],
        }
    }

    /// Context that starts `entry` on the stack ending at `stack_top`.
    ///
    /// The entry trampoline receives `entry` in x19 and branches to it with a
    /// zeroed frame pointer.
    pub fn seeded(stack_top: usize, entry: ContextEntry) -> Self {
        let mut ctx = Self::zero();
        ctx.sp = (stack_top & !0xF) as u64;
        ctx.lr = super::ffi_boundary::context_entry_address() as u64;
        ctx.x[0] = entry as usize as u64;
        ctx
    }

    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.sp as usize
    }

    #[inline]
    pub fn resume_address(&self) -> usize {
        self.lr as usize
    }
}

#[cfg(target_arch = "aarch64")]
pub const OFF_X19: usize = offset_of!(ExecutionContext, x);
#[cfg(target_arch = "aarch64")]
pub const OFF_FP: usize = offset_of!(ExecutionContext, fp);
#[cfg(target_arch = "aarch64")]
pub const OFF_SP: usize = offset_of!(ExecutionContext, sp);
#[cfg(target_arch = "aarch64")]
pub const OFF_D8: usize = offset_of!(ExecutionContext, d);

#[cfg(target_arch = "aarch64")]
const_assert_eq!(OFF_X19, 0);
#[cfg(target_arch = "aarch64")]
const_assert_eq!(OFF_FP, 80);
#[cfg(target_arch = "aarch64")]
const_assert_eq!(OFF_SP, 96);
#[cfg(target_arch = "aarch64")]
const_assert_eq!(OFF_D8, 104);

// uthreads_context_switch(save_into: x0, resume_from: x1)
//
// lr holds the caller's return address, so `ret` after loading the other
// context resumes it at its own call site.
#[cfg(target_arch = "aarch64")]
global_asm!(
    ".text",
    ".global uthreads_context_switch",
    ".type uthreads_context_switch, %function",
    ".p2align 2",
    "uthreads_context_switch:",
    "    mov x9, sp",
    "    stp x19, x20, [x0, #0]",
    "    stp x21, x22, [x0, #16]",
    "    stp x23, x24, [x0, #32]",
    "    stp x25, x26, [x0, #48]",
    "    stp x27, x28, [x0, #64]",
    "    stp x29, x30, [x0, #80]",
    "    str x9, [x0, #96]",
    "    stp d8, d9, [x0, #104]",
    "    stp d10, d11, [x0, #120]",
    "    stp d12, d13, [x0, #136]",
    "    stp d14, d15, [x0, #152]",
    "    ldp x19, x20, [x1, #0]",
    "    ldp x21, x22, [x1, #16]",
    "    ldp x23, x24, [x1, #32]",
    "    ldp x25, x26, [x1, #48]",
    "    ldp x27, x28, [x1, #64]",
    "    ldp x29, x30, [x1, #80]",
    "    ldr x9, [x1, #96]",
    "    ldp d8, d9, [x1, #104]",
    "    ldp d10, d11, [x1, #120]",
    "    ldp d12, d13, [x1, #136]",
    "    ldp d14, d15, [x1, #152]",
    "    mov sp, x9",
    "    ret",
    ".size uthreads_context_switch, . - uthreads_context_switch",
    "",
    ".global uthreads_context_entry",
    ".type uthreads_context_entry, %function",
    ".p2align 2",
    "uthreads_context_entry:",
    "    mov x29, xzr",
    "    blr x19",
    "    brk #1",
    ".size uthreads_context_entry, . - uthreads_context_entry",
);

#[cfg(not(all(
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
compile_error!("uthreads supports x86_64 and aarch64 Linux only");

/// Save the running context into `save_into` and resume `resume_from`.
///
/// Returns when something later resumes `save_into`.
///
/// # Safety
///
/// Both pointers must be valid and `resume_from` must hold a context that was
/// either seeded or saved by this routine and whose stack is still alive.
/// No lock may be held across the call.
#[inline]
pub unsafe fn switch(save_into: *mut ExecutionContext, resume_from: *const ExecutionContext) {
    unsafe { super::ffi_boundary::context_switch(save_into, resume_from) }
}

/// Resume `resume_from` without keeping the running context.
///
/// # Safety
///
/// Same requirements as [`switch`]. The abandoned stack is never resumed.
pub unsafe fn restore(resume_from: *const ExecutionContext) -> ! {
    let mut discarded = ExecutionContext::zero();
    unsafe { switch(&raw mut discarded, resume_from) };
    unreachable!("discarded context was resumed");
}

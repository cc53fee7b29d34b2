//! x86_64 thread state.
//!
//! Register file in the layout the host's `thread_set_state` expects for
//! the 64-bit thread flavor.

use crate::config::{STACK_ALIGN, STACK_RESERVED_SLOT};

/// RFLAGS: IF (Interrupt Flag) enabled, reserved bit 1 set
const INITIAL_RFLAGS: u64 = 0x200 | 0x2;

/// RFLAGS interrupt-enable bit
const RFLAGS_IF: u64 = 0x200;

/// Full register context for a new thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct ExecutionContext {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rdi: u64,
    pub rsi: u64,
    /// RBP register (frame pointer)
    pub rbp: u64,
    /// RSP register (stack pointer)
    pub rsp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    /// Instruction pointer
    pub rip: u64,
    /// RFLAGS register
    pub rflags: u64,
    /// Code segment (left to the host)
    pub cs: u64,
    pub fs: u64,
    pub gs: u64,
}

impl ExecutionContext {
    /// Where the thread starts executing.
    pub fn instruction_pointer(&self) -> u64 {
        self.rip
    }

    /// Initial stack pointer.
    pub fn stack_pointer(&self) -> u64 {
        self.rsp
    }

    /// Initial frame pointer.
    pub fn frame_pointer(&self) -> u64 {
        self.rbp
    }

    /// Check whether the thread starts with interrupts enabled.
    pub fn interrupts_enabled(&self) -> bool {
        self.rflags & RFLAGS_IF != 0
    }
}

/// Build the context a fresh thread starts from.
///
/// `stack_top` is one past the highest byte of the thread's stack. The
/// stack pointer is aligned down to 16 bytes and one slot is reserved
/// below it, as if a call had just pushed a return address. There is no
/// caller frame, so RBP is zero.
pub fn build_context(entry: u64, stack_top: u64) -> ExecutionContext {
    let aligned = stack_top & !(STACK_ALIGN - 1);

    ExecutionContext {
        rip: entry,
        rsp: aligned - STACK_RESERVED_SLOT,
        rbp: 0,
        rflags: INITIAL_RFLAGS,
        ..ExecutionContext::default()
    }
}

//! System call handling module.
//!
//! Process-control calls exposed to running processes: `fork` and
//! `exec`, plus a numbered dispatch entry point taking raw register
//! arguments.

pub mod handlers;

use crate::error::ProcessError;
use crate::host::KernelHost;
use crate::process::ProcessTable;

pub use handlers::{exec, fork, Caller};

/// `fork` flag in `arg2`: `arg1` is a PID rather than a code address.
pub const FORK_BY_PID: u64 = 1;

/// System call numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum SyscallNumber {
    /// Fork process.
    Fork = 7,
    /// Execute new code.
    Exec = 8,
}

impl TryFrom<u64> for SyscallNumber {
    type Error = ();

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(SyscallNumber::Fork),
            8 => Ok(SyscallNumber::Exec),
            _ => Err(()),
        }
    }
}

/// System call result.
pub type SyscallResult = Result<u64, SyscallError>;

/// System call error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum SyscallError {
    /// Invalid system call number.
    InvalidSyscall = -1,
    /// Invalid argument.
    InvalidArgument = -2,
    /// Resource not found.
    NotFound = -4,
    /// Out of memory.
    OutOfMemory = -7,
    /// Kernel thread could not be started.
    ThreadFailed = -15,
}

impl From<ProcessError> for SyscallError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::OutOfMemory => SyscallError::OutOfMemory,
            ProcessError::ThreadBootstrapFailed(_) => SyscallError::ThreadFailed,
            ProcessError::ProcessNotFound => SyscallError::NotFound,
        }
    }
}

/// System call context (registers at syscall time).
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct SyscallContext {
    /// System call number.
    pub syscall_num: u64,
    /// First argument.
    pub arg1: u64,
    /// Second argument.
    pub arg2: u64,
    /// Third argument.
    pub arg3: u64,
}

/// Dispatch a system call.
///
/// Returns the call's result value, or a negative [`SyscallError`] code.
pub fn dispatch<H: KernelHost>(table: &ProcessTable<H>, ctx: &SyscallContext) -> i64 {
    let result = match SyscallNumber::try_from(ctx.syscall_num) {
        Ok(syscall) => handlers::handle(table, syscall, ctx),
        Err(_) => Err(SyscallError::InvalidSyscall),
    };

    match result {
        Ok(value) => value as i64,
        Err(err) => {
            log::debug!("[KEEL Syscall] {} -> {:?}", ctx.syscall_num, err);
            err as i64
        }
    }
}

//! System call handlers.

use super::{SyscallContext, SyscallError, SyscallNumber, SyscallResult, FORK_BY_PID};
use crate::error::ProcessError;
use crate::host::KernelHost;
use crate::process::{CodeEntry, Pid, ProcessTable};

/// How `fork` finds the process it duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// The first process whose code entry equals this address.
    ///
    /// Callers usually pass an address from their own code. Nothing
    /// checks that the match is unique, or that the process found is
    /// really the one asking; two processes started at the same entry
    /// are indistinguishable here.
    CodeEntry(CodeEntry),
    /// The process with this PID value.
    Pid(u64),
}

/// Handle a system call.
pub fn handle<H: KernelHost>(
    table: &ProcessTable<H>,
    syscall: SyscallNumber,
    ctx: &SyscallContext,
) -> SyscallResult {
    match syscall {
        SyscallNumber::Fork => handle_fork(table, ctx),
        SyscallNumber::Exec => handle_exec(table, ctx),
    }
}

/// Fork the calling process.
fn handle_fork<H: KernelHost>(table: &ProcessTable<H>, ctx: &SyscallContext) -> SyscallResult {
    let caller = match ctx.arg2 {
        0 => Caller::CodeEntry(CodeEntry(ctx.arg1)),
        FORK_BY_PID => Caller::Pid(ctx.arg1),
        _ => return Err(SyscallError::InvalidArgument),
    };

    let pid = fork(table, caller)?;
    Ok(pid.value())
}

/// Replace a process's code.
fn handle_exec<H: KernelHost>(table: &ProcessTable<H>, ctx: &SyscallContext) -> SyscallResult {
    if ctx.arg2 == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    exec(table, ctx.arg1, CodeEntry(ctx.arg2))?;
    Ok(0)
}

/// Start a copy of the calling process.
///
/// The copy gets the caller's name, owner and code entry, the next PID
/// after the highest ever used, and its own thread and stack. The caller
/// is not touched. Returns the new PID.
pub fn fork<H: KernelHost>(table: &ProcessTable<H>, caller: Caller) -> Result<Pid, ProcessError> {
    let child = match caller {
        Caller::CodeEntry(entry) => table.duplicate(|r| r.code_entry() == entry),
        Caller::Pid(pid) => table.duplicate(|r| r.pid().value() == pid),
    }?;

    log::debug!("[KEEL Syscall] fork({:?}) -> PID {}", caller, child.pid);
    Ok(child.pid)
}

/// Replace the code process `pid` runs with `entry`.
pub fn exec<H: KernelHost>(
    table: &ProcessTable<H>,
    pid: u64,
    entry: CodeEntry,
) -> Result<(), ProcessError> {
    table.replace_code(pid, entry)
}

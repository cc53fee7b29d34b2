//! Runtime boot and composition.
//!
//! Ties the permission registry and the process table together: parse
//! the registry once, set up the table, seed the statically known
//! processes, then serve fork/exec and permission checks.

use alloc::string::String;

use crate::config::KERNEL_TASK_NAME;
use crate::error::{BootError, ProcessError};
use crate::host::KernelHost;
use crate::process::{CodeEntry, Pid, ProcessTable};
use crate::registry::{Capabilities, ParseMode, UserRecord, UserRegistry};
use crate::syscall::{self, Caller, SyscallContext};

/// A process to start at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialProcess<'a> {
    pub name: &'a str,
    /// PID display text
    pub pid: &'a str,
    pub owner_uid: &'a str,
    pub entry: CodeEntry,
}

impl<'a> InitialProcess<'a> {
    /// The kernel task: PID 0, owned by UID 1.
    pub fn kernel_task(entry: CodeEntry) -> Self {
        Self {
            name: KERNEL_TASK_NAME,
            pid: "0",
            owner_uid: "1",
            entry,
        }
    }
}

/// The booted runtime core.
pub struct Runtime<H: KernelHost> {
    users: UserRegistry,
    processes: ProcessTable<H>,
}

impl<H: KernelHost> Runtime<H> {
    /// Boot with a leniently parsed registry.
    pub fn boot(
        host: H,
        registry_text: &str,
        initial: &[InitialProcess<'_>],
    ) -> Result<Self, BootError> {
        Self::boot_with(host, registry_text, ParseMode::Lenient, initial)
    }

    /// Boot with an explicit registry parse mode.
    ///
    /// If any initial process fails to start, the processes already
    /// started are torn down before the error is returned.
    pub fn boot_with(
        host: H,
        registry_text: &str,
        mode: ParseMode,
        initial: &[InitialProcess<'_>],
    ) -> Result<Self, BootError> {
        let users = UserRegistry::parse_with(registry_text, mode)?;
        log::info!("[KEEL Boot] Parsed users: {}", users.len());

        let processes = ProcessTable::initialize(host).map_err(BootError::Table)?;

        for process in initial {
            processes
                .add(
                    process.name,
                    Pid::parse(process.pid),
                    process.owner_uid,
                    process.entry,
                )
                .map_err(|source| {
                    log::warn!("[KEEL Boot] Failed to start {}: {}", process.name, source);
                    BootError::Seed {
                        name: String::from(process.name),
                        source,
                    }
                })?;
        }

        log::info!("[KEEL Boot] Started {} initial processes", processes.len());

        Ok(Self { users, processes })
    }

    /// The permission registry
    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    /// The process table
    pub fn processes(&self) -> &ProcessTable<H> {
        &self.processes
    }

    /// The registry entry for the owner of process `pid`, if both exist.
    pub fn owner_of(&self, pid: u64) -> Option<&UserRecord> {
        let uid = self
            .processes
            .with_process(pid, |r| String::from(r.owner_uid()))?;
        self.users.find_by_uid(&uid)
    }

    /// Check whether process `pid` runs as a user holding all of
    /// `required`. Unknown processes and unknown owners are denied.
    pub fn authorize(&self, pid: u64, required: Capabilities) -> bool {
        let granted = self
            .owner_of(pid)
            .map(|user| user.has(required))
            .unwrap_or(false);

        if !granted {
            log::debug!("[KEEL Boot] PID {} denied {:?}", pid, required);
        }
        granted
    }

    /// Duplicate the calling process. See [`syscall::fork`].
    pub fn fork(&self, caller: Caller) -> Result<Pid, ProcessError> {
        syscall::fork(&self.processes, caller)
    }

    /// Replace the code of process `pid`. See [`syscall::exec`].
    pub fn exec(&self, pid: u64, entry: CodeEntry) -> Result<(), ProcessError> {
        syscall::exec(&self.processes, pid, entry)
    }

    /// Raw system call entry.
    pub fn syscall(&self, ctx: &SyscallContext) -> i64 {
        syscall::dispatch(&self.processes, ctx)
    }

    /// Stop every process and release the table.
    pub fn shutdown(self) {
        log::info!("[KEEL Boot] Shutting down");
        self.processes.teardown();
    }
}

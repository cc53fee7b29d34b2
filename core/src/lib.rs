//! Keel process core.
//!
//! Process and identity management for the Keel runtime, which runs on
//! top of a message-passing microkernel:
//! - Process table owning one kernel thread and stack per process
//! - Thread bootstrap with a hand-built register context
//! - Permission registry parsed from the boot-time user list
//! - `fork` / `exec` system calls

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch;
pub mod config;
pub mod error;
pub mod host;
pub mod process;
pub mod registry;
pub mod runtime;
pub mod syscall;

#[cfg(test)]
mod tests;

pub use error::{BootError, BootstrapError, BootstrapStage, ParseError, ProcessError};
pub use host::{KernReturn, KernelHost, SimulatedHost};
pub use process::{CodeEntry, Pid, ProcessSnapshot, ProcessTable};
pub use registry::{Capabilities, ParseMode, UserRecord, UserRegistry};
pub use runtime::{InitialProcess, Runtime};
pub use syscall::Caller;

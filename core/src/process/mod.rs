//! Process Management
//!
//! The process table and the bootstrap that gives every process its own
//! kernel thread and stack.

pub mod bootstrap;
pub mod table;

pub use bootstrap::{bootstrap, retire, ThreadStack};
pub use table::{CodeEntry, Pid, ProcessRecord, ProcessSnapshot, ProcessTable};

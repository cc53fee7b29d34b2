//! Error types for the process core.

use alloc::string::String;
use core::fmt;

use crate::host::KernReturn;

/// Step of the thread bootstrap sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    /// Stack allocation.
    AllocateStack,
    /// Kernel thread creation.
    CreateThread,
    /// Installing the register context.
    SetState,
    /// Resuming the thread.
    Resume,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapStage::AllocateStack => "stack allocation",
            BootstrapStage::CreateThread => "thread creation",
            BootstrapStage::SetState => "context install",
            BootstrapStage::Resume => "thread resume",
        };
        f.write_str(name)
    }
}

/// A failed thread bootstrap.
///
/// Everything acquired before `stage` has already been rolled back when
/// this value is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapError {
    /// Step that failed.
    pub stage: BootstrapStage,
    /// Host status word reported by that step.
    pub code: KernReturn,
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.code)
    }
}

/// Process table error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// Table storage could not be allocated or grown
    OutOfMemory,
    /// Kernel thread, stack or context setup failed
    ThreadBootstrapFailed(BootstrapError),
    /// No process with the requested PID (or caller hint)
    ProcessNotFound,
}

impl From<BootstrapError> for ProcessError {
    fn from(e: BootstrapError) -> Self {
        ProcessError::ThreadBootstrapFailed(e)
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::OutOfMemory => write!(f, "out of memory"),
            ProcessError::ThreadBootstrapFailed(e) => write!(f, "thread bootstrap failed: {}", e),
            ProcessError::ProcessNotFound => write!(f, "process not found"),
        }
    }
}

/// Why a registry line was rejected in strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A literal separator was not where the grammar puts it.
    MissingDelimiter(char),
    /// A field ran past its length limit.
    FieldTooLong(&'static str),
    /// Input ended in the middle of a record.
    UnexpectedEnd,
}

/// Strict-mode registry parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number of the offending record.
    pub line: usize,
    /// What was wrong with it.
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParseErrorKind::MissingDelimiter(c) => {
                write!(f, "line {}: expected '{}'", self.line, c.escape_default())
            }
            ParseErrorKind::FieldTooLong(field) => {
                write!(f, "line {}: {} too long", self.line, field)
            }
            ParseErrorKind::UnexpectedEnd => write!(f, "line {}: unexpected end of input", self.line),
        }
    }
}

/// Runtime boot failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    /// The process table could not be set up
    Table(ProcessError),
    /// The registry text was rejected (strict mode only)
    Registry(ParseError),
    /// An initial process could not be started
    Seed {
        /// Name of the process that failed
        name: String,
        /// Underlying table error
        source: ProcessError,
    },
}

impl From<ParseError> for BootError {
    fn from(e: ParseError) -> Self {
        BootError::Registry(e)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Table(e) => write!(f, "process table setup failed: {}", e),
            BootError::Registry(e) => write!(f, "user registry rejected: {}", e),
            BootError::Seed { name, source } => write!(f, "failed to start {}: {}", name, source),
        }
    }
}

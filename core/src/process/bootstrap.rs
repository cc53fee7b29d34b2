//! Thread bootstrap.
//!
//! Turns a code entry into a running kernel thread on its own stack:
//! allocate stack, create thread, install context, resume. A failure at
//! any step releases everything acquired before it, so the caller either
//! gets a complete [`ThreadStack`] or nothing.

use super::table::CodeEntry;
use crate::arch::build_context;
use crate::config::STACK_SIZE;
use crate::error::{BootstrapError, BootstrapStage};
use crate::host::{KernelHost, StackRegion, ThreadHandle};

/// A live thread and the stack it runs on.
///
/// The two are acquired and released together. Not `Clone`: whoever
/// holds the value is the only one who may retire it.
#[derive(Debug, PartialEq, Eq)]
pub struct ThreadStack {
    thread: ThreadHandle,
    stack: StackRegion,
}

impl ThreadStack {
    pub fn thread(&self) -> ThreadHandle {
        self.thread
    }

    pub fn stack(&self) -> StackRegion {
        self.stack
    }
}

/// Start a new thread executing at `entry`.
pub fn bootstrap<H: KernelHost + ?Sized>(
    host: &H,
    entry: CodeEntry,
) -> Result<ThreadStack, BootstrapError> {
    let stack = host.vm_allocate(STACK_SIZE).map_err(|code| BootstrapError {
        stage: BootstrapStage::AllocateStack,
        code,
    })?;

    let thread = match host.thread_create() {
        Ok(thread) => thread,
        Err(code) => {
            release_stack(host, stack);
            return Err(BootstrapError {
                stage: BootstrapStage::CreateThread,
                code,
            });
        }
    };

    let context = build_context(entry.as_u64(), stack.top());

    let started = host
        .thread_set_state(thread, &context)
        .map_err(|code| (BootstrapStage::SetState, code))
        .and_then(|()| {
            host.thread_resume(thread)
                .map_err(|code| (BootstrapStage::Resume, code))
        });

    if let Err((stage, code)) = started {
        log::warn!(
            "[KEEL Proc] Bootstrap of {} failed at {} ({}), rolling back",
            entry,
            stage,
            code
        );
        retire(host, ThreadStack { thread, stack });
        return Err(BootstrapError { stage, code });
    }

    log::debug!(
        "[KEEL Proc] {} running at {} (stack {:#x}..{:#x})",
        thread,
        entry,
        stack.base,
        stack.top()
    );

    Ok(ThreadStack { thread, stack })
}

/// Terminate the thread, then release its stack.
///
/// The stack is released even if termination reports an error; the
/// thread handle is dead to us either way.
pub fn retire<H: KernelHost + ?Sized>(host: &H, pair: ThreadStack) {
    if let Err(code) = host.thread_terminate(pair.thread) {
        log::warn!("[KEEL Proc] thread_terminate({}) failed: {}", pair.thread, code);
    }
    release_stack(host, pair.stack);
}

fn release_stack<H: KernelHost + ?Sized>(host: &H, stack: StackRegion) {
    if let Err(code) = host.vm_deallocate(stack) {
        log::warn!(
            "[KEEL Proc] vm_deallocate({:#x}, {}) failed: {}",
            stack.base,
            stack.size,
            code
        );
    }
}

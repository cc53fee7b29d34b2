//! Host Kernel Interface
//!
//! The narrow set of kernel-object calls the process core makes on the
//! underlying message-passing kernel: anonymous memory for stacks, and
//! thread create/state/resume/terminate. Everything else in the crate
//! goes through [`KernelHost`] and never touches the kernel directly.

pub mod sim;

use alloc::sync::Arc;
use core::fmt;

use crate::arch::ExecutionContext;

pub use sim::{HostCall, SimCounters, SimulatedHost};

/// Mach-style kernel status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernReturn(pub i32);

impl KernReturn {
    /// Call succeeded.
    pub const SUCCESS: KernReturn = KernReturn(0);
    /// Address is not valid in the task.
    pub const INVALID_ADDRESS: KernReturn = KernReturn(1);
    /// No room in the address space.
    pub const NO_SPACE: KernReturn = KernReturn(3);
    /// Bad argument (unknown port, bad flavor).
    pub const INVALID_ARGUMENT: KernReturn = KernReturn(4);
    /// Unspecified failure.
    pub const FAILURE: KernReturn = KernReturn(5);
    /// Kernel ran out of a resource.
    pub const RESOURCE_SHORTAGE: KernReturn = KernReturn(6);
    /// Target object was already terminated.
    pub const TERMINATED: KernReturn = KernReturn(37);

    /// Check whether this is the success code.
    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }
}

impl fmt::Display for KernReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::SUCCESS => "KERN_SUCCESS",
            Self::INVALID_ADDRESS => "KERN_INVALID_ADDRESS",
            Self::NO_SPACE => "KERN_NO_SPACE",
            Self::INVALID_ARGUMENT => "KERN_INVALID_ARGUMENT",
            Self::FAILURE => "KERN_FAILURE",
            Self::RESOURCE_SHORTAGE => "KERN_RESOURCE_SHORTAGE",
            Self::TERMINATED => "KERN_TERMINATED",
            _ => return write!(f, "kern_return {}", self.0),
        };
        f.write_str(name)
    }
}

/// Kernel thread handle (a port name on the host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadHandle(pub u32);

impl fmt::Display for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread:{:#x}", self.0)
    }
}

/// A block of host memory backing one thread stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackRegion {
    /// Lowest address of the region.
    pub base: u64,
    /// Size in bytes.
    pub size: usize,
}

impl StackRegion {
    /// One past the highest address of the region.
    pub fn top(&self) -> u64 {
        self.base + self.size as u64
    }

    /// Check whether an address falls inside the region.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.top()
    }
}

/// Kernel-object primitives required by the thread bootstrap.
///
/// Every call is one-shot and returns immediately. Implementations must
/// be callable from any thread; the process table serializes its own
/// calls but other holders of the host may not.
pub trait KernelHost {
    /// Allocate `size` bytes of zeroed, page-aligned memory anywhere in
    /// the task.
    fn vm_allocate(&self, size: usize) -> Result<StackRegion, KernReturn>;

    /// Release a region previously returned by [`KernelHost::vm_allocate`].
    fn vm_deallocate(&self, region: StackRegion) -> Result<(), KernReturn>;

    /// Create a suspended kernel thread in the current task.
    fn thread_create(&self) -> Result<ThreadHandle, KernReturn>;

    /// Install a full register context into a suspended thread.
    fn thread_set_state(
        &self,
        thread: ThreadHandle,
        context: &ExecutionContext,
    ) -> Result<(), KernReturn>;

    /// Let a thread start running.
    fn thread_resume(&self, thread: ThreadHandle) -> Result<(), KernReturn>;

    /// Stop a thread immediately and destroy it.
    fn thread_terminate(&self, thread: ThreadHandle) -> Result<(), KernReturn>;
}

impl<H: KernelHost + ?Sized> KernelHost for Arc<H> {
    fn vm_allocate(&self, size: usize) -> Result<StackRegion, KernReturn> {
        (**self).vm_allocate(size)
    }

    fn vm_deallocate(&self, region: StackRegion) -> Result<(), KernReturn> {
        (**self).vm_deallocate(region)
    }

    fn thread_create(&self) -> Result<ThreadHandle, KernReturn> {
        (**self).thread_create()
    }

    fn thread_set_state(
        &self,
        thread: ThreadHandle,
        context: &ExecutionContext,
    ) -> Result<(), KernReturn> {
        (**self).thread_set_state(thread, context)
    }

    fn thread_resume(&self, thread: ThreadHandle) -> Result<(), KernReturn> {
        (**self).thread_resume(thread)
    }

    fn thread_terminate(&self, thread: ThreadHandle) -> Result<(), KernReturn> {
        (**self).thread_terminate(thread)
    }
}

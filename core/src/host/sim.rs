//! In-memory kernel host.
//!
//! Hands out fake port names and page-aligned addresses, keeps a ledger
//! of every live thread and region, and can be told to fail the next call
//! of a given kind. Used by the test suites and by host-side builds that
//! have no real kernel underneath.

use hashbrown::HashMap;
use spin::Mutex;

use super::{KernReturn, KernelHost, StackRegion, ThreadHandle};
use crate::arch::ExecutionContext;
use crate::config::PAGE_SIZE;

/// First port name handed out for threads.
const FIRST_PORT: u32 = 0x103;

/// Base of the simulated allocation arena.
const ARENA_BASE: u64 = 0x0000_7000_0000_0000;

/// Host call kinds, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    /// `vm_allocate`
    Allocate,
    /// `vm_deallocate`
    Deallocate,
    /// `thread_create`
    ThreadCreate,
    /// `thread_set_state`
    SetState,
    /// `thread_resume`
    Resume,
    /// `thread_terminate`
    Terminate,
}

/// Per-call success counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimCounters {
    pub allocations: usize,
    pub deallocations: usize,
    pub threads_created: usize,
    pub states_installed: usize,
    pub resumes: usize,
    pub terminations: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimThread {
    context: Option<ExecutionContext>,
    running: bool,
}

struct SimState {
    next_port: u32,
    next_address: u64,
    threads: HashMap<ThreadHandle, SimThread>,
    regions: HashMap<u64, usize>,
    /// call -> (successful calls still to let through, failure code)
    failures: HashMap<HostCall, (usize, KernReturn)>,
    counters: SimCounters,
}

impl SimState {
    fn new() -> Self {
        Self {
            next_port: FIRST_PORT,
            next_address: ARENA_BASE,
            threads: HashMap::new(),
            regions: HashMap::new(),
            failures: HashMap::new(),
            counters: SimCounters::default(),
        }
    }

    fn check(&mut self, call: HostCall) -> Result<(), KernReturn> {
        match self.failures.get_mut(&call) {
            Some((0, code)) => {
                let code = *code;
                self.failures.remove(&call);
                Err(code)
            }
            Some((skip, _)) => {
                *skip -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Deterministic in-memory [`KernelHost`].
pub struct SimulatedHost {
    state: Mutex<SimState>,
}

impl SimulatedHost {
    /// Create a host with no live objects.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::new()),
        }
    }

    /// Make the next `call` fail with `code`. One-shot.
    pub fn fail_next(&self, call: HostCall, code: KernReturn) {
        self.fail_after(call, 0, code);
    }

    /// Let `skip` calls of this kind through, then fail the one after.
    pub fn fail_after(&self, call: HostCall, skip: usize, code: KernReturn) {
        self.state.lock().failures.insert(call, (skip, code));
    }

    /// Success counters so far.
    pub fn counters(&self) -> SimCounters {
        self.state.lock().counters
    }

    /// Number of threads created and not yet terminated.
    pub fn live_threads(&self) -> usize {
        self.state.lock().threads.len()
    }

    /// Number of regions allocated and not yet released.
    pub fn live_regions(&self) -> usize {
        self.state.lock().regions.len()
    }

    /// Check whether a thread exists.
    pub fn is_thread_live(&self, thread: ThreadHandle) -> bool {
        self.state.lock().threads.contains_key(&thread)
    }

    /// Check whether a thread has been resumed.
    pub fn is_running(&self, thread: ThreadHandle) -> bool {
        self.state
            .lock()
            .threads
            .get(&thread)
            .map(|t| t.running)
            .unwrap_or(false)
    }

    /// Check whether a region is still allocated.
    pub fn is_region_live(&self, region: StackRegion) -> bool {
        self.state.lock().regions.get(&region.base) == Some(&region.size)
    }

    /// Context installed into a live thread, if any.
    pub fn context_of(&self, thread: ThreadHandle) -> Option<ExecutionContext> {
        self.state.lock().threads.get(&thread).and_then(|t| t.context)
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelHost for SimulatedHost {
    fn vm_allocate(&self, size: usize) -> Result<StackRegion, KernReturn> {
        let mut state = self.state.lock();
        state.check(HostCall::Allocate)?;
        if size == 0 {
            return Err(KernReturn::INVALID_ARGUMENT);
        }

        let pages = (size + PAGE_SIZE - 1) / PAGE_SIZE;
        let base = state.next_address;
        // One unmapped guard page between regions.
        state.next_address += ((pages + 1) * PAGE_SIZE) as u64;
        state.regions.insert(base, size);
        state.counters.allocations += 1;
        Ok(StackRegion { base, size })
    }

    fn vm_deallocate(&self, region: StackRegion) -> Result<(), KernReturn> {
        let mut state = self.state.lock();
        state.check(HostCall::Deallocate)?;
        match state.regions.get(&region.base) {
            Some(&size) if size == region.size => {
                state.regions.remove(&region.base);
                state.counters.deallocations += 1;
                Ok(())
            }
            _ => Err(KernReturn::INVALID_ADDRESS),
        }
    }

    fn thread_create(&self) -> Result<ThreadHandle, KernReturn> {
        let mut state = self.state.lock();
        state.check(HostCall::ThreadCreate)?;
        let handle = ThreadHandle(state.next_port);
        state.next_port += 1;
        state.threads.insert(handle, SimThread::default());
        state.counters.threads_created += 1;
        Ok(handle)
    }

    fn thread_set_state(
        &self,
        thread: ThreadHandle,
        context: &ExecutionContext,
    ) -> Result<(), KernReturn> {
        let mut state = self.state.lock();
        state.check(HostCall::SetState)?;
        let entry = state
            .threads
            .get_mut(&thread)
            .ok_or(KernReturn::INVALID_ARGUMENT)?;
        entry.context = Some(*context);
        state.counters.states_installed += 1;
        Ok(())
    }

    fn thread_resume(&self, thread: ThreadHandle) -> Result<(), KernReturn> {
        let mut state = self.state.lock();
        state.check(HostCall::Resume)?;
        let entry = state
            .threads
            .get_mut(&thread)
            .ok_or(KernReturn::INVALID_ARGUMENT)?;
        if entry.context.is_none() {
            // Resuming a thread with no state would run garbage.
            return Err(KernReturn::FAILURE);
        }
        entry.running = true;
        state.counters.resumes += 1;
        Ok(())
    }

    fn thread_terminate(&self, thread: ThreadHandle) -> Result<(), KernReturn> {
        let mut state = self.state.lock();
        state.check(HostCall::Terminate)?;
        if state.threads.remove(&thread).is_none() {
            return Err(KernReturn::TERMINATED);
        }
        state.counters.terminations += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::build_context;

    #[test]
    fn test_regions_do_not_overlap() {
        let host = SimulatedHost::new();
        let a = host.vm_allocate(PAGE_SIZE * 2).unwrap();
        let b = host.vm_allocate(PAGE_SIZE).unwrap();

        assert_eq!(a.base % PAGE_SIZE as u64, 0);
        assert!(b.base >= a.top());
        assert_eq!(host.live_regions(), 2);
    }

    #[test]
    fn test_double_free_rejected() {
        let host = SimulatedHost::new();
        let region = host.vm_allocate(PAGE_SIZE).unwrap();

        assert!(host.vm_deallocate(region).is_ok());
        assert_eq!(host.vm_deallocate(region), Err(KernReturn::INVALID_ADDRESS));
        assert_eq!(host.counters().deallocations, 1);
    }

    #[test]
    fn test_resume_requires_state() {
        let host = SimulatedHost::new();
        let thread = host.thread_create().unwrap();
        assert_eq!(host.thread_resume(thread), Err(KernReturn::FAILURE));

        let ctx = build_context(0x4000, 0x9000);
        host.thread_set_state(thread, &ctx).unwrap();
        host.thread_resume(thread).unwrap();
        assert!(host.is_running(thread));
        assert_eq!(host.context_of(thread), Some(ctx));
    }

    #[test]
    fn test_fail_next_is_one_shot() {
        let host = SimulatedHost::new();
        host.fail_next(HostCall::ThreadCreate, KernReturn::RESOURCE_SHORTAGE);

        assert_eq!(host.thread_create(), Err(KernReturn::RESOURCE_SHORTAGE));
        assert!(host.thread_create().is_ok());
        assert_eq!(host.counters().threads_created, 1);
    }

    #[test]
    fn test_fail_after_skips() {
        let host = SimulatedHost::new();
        host.fail_after(HostCall::Allocate, 2, KernReturn::NO_SPACE);

        assert!(host.vm_allocate(PAGE_SIZE).is_ok());
        assert!(host.vm_allocate(PAGE_SIZE).is_ok());
        assert_eq!(host.vm_allocate(PAGE_SIZE), Err(KernReturn::NO_SPACE));
        assert!(host.vm_allocate(PAGE_SIZE).is_ok());
    }

    #[test]
    fn test_terminate_twice() {
        let host = SimulatedHost::new();
        let thread = host.thread_create().unwrap();

        assert!(host.thread_terminate(thread).is_ok());
        assert!(!host.is_thread_live(thread));
        assert_eq!(host.thread_terminate(thread), Err(KernReturn::TERMINATED));
    }
}

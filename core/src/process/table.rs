//! Process Table
//!
//! The table of every process the runtime has started. Each record owns
//! one kernel thread and its stack; the table owns the records. All
//! operations, lookups included, run under one table-wide lock.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use spin::Mutex;

use super::bootstrap::{self, ThreadStack};
use crate::config::{INITIAL_TABLE_CAPACITY, PID_TEXT_MAX, PROCESS_NAME_MAX, ID_MAX};
use crate::error::ProcessError;
use crate::host::{KernelHost, StackRegion, ThreadHandle};

/// Opaque address a process thread starts executing at.
///
/// Never dereferenced by the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeEntry(pub u64);

impl CodeEntry {
    /// Get the raw address
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CodeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Process identifier.
///
/// Carries the display text it was created from and its integer value.
/// Identity is the integer value, so `"007"` and `7` name the same
/// process.
#[derive(Debug, Clone)]
pub struct Pid {
    text: String,
    value: u64,
}

impl Pid {
    /// PID of the kernel task
    pub const KERNEL_VALUE: u64 = 0;

    /// Build a PID from its display text.
    ///
    /// Text beyond 7 characters is dropped. The value is the leading run
    /// of decimal digits, or 0 if there is none.
    pub fn parse(text: &str) -> Self {
        let text = truncate(text, PID_TEXT_MAX);
        let value = text
            .bytes()
            .take_while(u8::is_ascii_digit)
            .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add((d - b'0') as u64));
        Self {
            text: String::from(text),
            value,
        }
    }

    /// Build a PID from an integer value
    pub fn from_value(value: u64) -> Self {
        Self {
            text: value.to_string(),
            value,
        }
    }

    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Display text
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Pid {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Pid {}

impl core::hash::Hash for Pid {
    fn hash<S: core::hash::Hasher>(&self, state: &mut S) {
        self.value.hash(state);
    }
}

impl From<u64> for Pid {
    fn from(value: u64) -> Self {
        Self::from_value(value)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One live execution unit.
#[derive(Debug)]
pub struct ProcessRecord {
    name: String,
    pid: Pid,
    /// UID of the owning user, matched by value against the registry
    owner_uid: String,
    code_entry: CodeEntry,
    /// `None` only after a failed re-bootstrap
    thread: Option<ThreadStack>,
}

impl ProcessRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn owner_uid(&self) -> &str {
        &self.owner_uid
    }

    pub fn code_entry(&self) -> CodeEntry {
        self.code_entry
    }

    /// Thread handle, if the process has a live thread
    pub fn thread(&self) -> Option<ThreadHandle> {
        self.thread.as_ref().map(ThreadStack::thread)
    }

    /// Stack region, if the process has a live thread
    pub fn stack(&self) -> Option<StackRegion> {
        self.thread.as_ref().map(ThreadStack::stack)
    }

    /// Check whether the process has a running thread
    pub fn is_live(&self) -> bool {
        self.thread.is_some()
    }

    fn snapshot(&self) -> ProcessSnapshot {
        ProcessSnapshot {
            name: self.name.clone(),
            pid: self.pid.clone(),
            owner_uid: self.owner_uid.clone(),
            code_entry: self.code_entry,
            thread: self.thread(),
            stack: self.stack(),
        }
    }
}

/// Copy of a process record, detached from the table lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub name: String,
    pub pid: Pid,
    pub owner_uid: String,
    pub code_entry: CodeEntry,
    pub thread: Option<ThreadHandle>,
    pub stack: Option<StackRegion>,
}

struct TableInner {
    records: Vec<ProcessRecord>,
    /// Logical capacity; doubles when an insert would exceed it
    capacity: usize,
    /// Highest PID value ever inserted
    highest_pid: u64,
}

/// Table of all processes, owning their threads and stacks
pub struct ProcessTable<H: KernelHost> {
    host: H,
    inner: Mutex<TableInner>,
}

impl<H: KernelHost> ProcessTable<H> {
    /// Set up an empty table with room for the initial capacity.
    pub fn initialize(host: H) -> Result<Self, ProcessError> {
        let mut records = Vec::new();
        records
            .try_reserve_exact(INITIAL_TABLE_CAPACITY)
            .map_err(|_| ProcessError::OutOfMemory)?;

        log::info!("[KEEL Proc] Process table initialized");

        Ok(Self {
            host,
            inner: Mutex::new(TableInner {
                records,
                capacity: INITIAL_TABLE_CAPACITY,
                highest_pid: 0,
            }),
        })
    }

    /// The host this table creates threads on
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Start a process running at `entry` and append it to the table.
    pub fn add(
        &self,
        name: &str,
        pid: Pid,
        owner_uid: &str,
        entry: CodeEntry,
    ) -> Result<ProcessSnapshot, ProcessError> {
        let mut inner = self.inner.lock();
        self.add_locked(&mut inner, name, pid, owner_uid, entry)
    }

    fn add_locked(
        &self,
        inner: &mut TableInner,
        name: &str,
        pid: Pid,
        owner_uid: &str,
        entry: CodeEntry,
    ) -> Result<ProcessSnapshot, ProcessError> {
        let grown = if inner.records.len() >= inner.capacity {
            let new_capacity = inner
                .capacity
                .checked_mul(2)
                .ok_or(ProcessError::OutOfMemory)?
                .max(INITIAL_TABLE_CAPACITY);
            let additional = new_capacity - inner.records.len();
            if inner.records.try_reserve_exact(additional).is_err() {
                log::warn!(
                    "[KEEL Proc] Cannot grow process table to {} entries",
                    new_capacity
                );
                return Err(ProcessError::OutOfMemory);
            }
            Some(new_capacity)
        } else {
            None
        };

        let thread = bootstrap::bootstrap(&self.host, entry)?;

        let record = ProcessRecord {
            name: String::from(truncate(name, PROCESS_NAME_MAX)),
            pid,
            owner_uid: String::from(truncate(owner_uid, ID_MAX)),
            code_entry: entry,
            thread: Some(thread),
        };

        if let Some(capacity) = grown {
            log::debug!(
                "[KEEL Proc] Process table grown {} -> {}",
                inner.capacity,
                capacity
            );
            inner.capacity = capacity;
        }
        inner.highest_pid = inner.highest_pid.max(record.pid.value());

        log::info!(
            "[KEEL Proc] Created process {} (PID {}, owner {})",
            record.name,
            record.pid,
            record.owner_uid
        );

        let snapshot = record.snapshot();
        inner.records.push(record);
        Ok(snapshot)
    }

    /// First process with the given name
    pub fn find_by_name(&self, name: &str) -> Option<ProcessSnapshot> {
        self.find(|r| r.name == name)
    }

    /// First process with the given PID value
    pub fn find_by_pid(&self, pid: u64) -> Option<ProcessSnapshot> {
        self.find(|r| r.pid.value() == pid)
    }

    /// First process started at the given code entry
    pub fn find_by_code_entry(&self, entry: CodeEntry) -> Option<ProcessSnapshot> {
        self.find(|r| r.code_entry == entry)
    }

    fn find<F>(&self, pred: F) -> Option<ProcessSnapshot>
    where
        F: Fn(&ProcessRecord) -> bool,
    {
        self.inner
            .lock()
            .records
            .iter()
            .find(|&r| pred(r))
            .map(ProcessRecord::snapshot)
    }

    /// Run a closure against the first process with the given PID value.
    ///
    /// Returns `None` if the process does not exist.
    pub fn with_process<F, R>(&self, pid: u64, f: F) -> Option<R>
    where
        F: FnOnce(&ProcessRecord) -> R,
    {
        let inner = self.inner.lock();
        inner.records.iter().find(|r| r.pid.value() == pid).map(f)
    }

    /// Replace the code a process runs.
    ///
    /// The old thread is terminated and its stack released, then a fresh
    /// thread is started at `entry`. If that fails the process is left
    /// with no thread and keeps its old code entry.
    pub fn replace_code(&self, pid: u64, entry: CodeEntry) -> Result<(), ProcessError> {
        let mut inner = self.inner.lock();
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.pid.value() == pid)
            .ok_or(ProcessError::ProcessNotFound)?;

        if let Some(old) = record.thread.take() {
            bootstrap::retire(&self.host, old);
        }

        match bootstrap::bootstrap(&self.host, entry) {
            Ok(thread) => {
                record.thread = Some(thread);
                record.code_entry = entry;
                log::info!("[KEEL Proc] Process {} now running at {}", record.pid, entry);
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "[KEEL Proc] Process {} left without a thread: {}",
                    record.pid,
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Duplicate the first process matching `source` under the next free
    /// PID. Lookup and insert happen in one critical section.
    pub(crate) fn duplicate<F>(&self, source: F) -> Result<ProcessSnapshot, ProcessError>
    where
        F: Fn(&ProcessRecord) -> bool,
    {
        let mut inner = self.inner.lock();
        let (name, owner, entry) = inner
            .records
            .iter()
            .find(|&r| source(r))
            .map(|r| (r.name.clone(), r.owner_uid.clone(), r.code_entry))
            .ok_or(ProcessError::ProcessNotFound)?;

        let pid = inner
            .highest_pid
            .checked_add(1)
            .ok_or(ProcessError::OutOfMemory)?;

        self.add_locked(&mut inner, &name, Pid::from_value(pid), &owner, entry)
    }

    /// Terminate every thread, release every stack and drop all records.
    ///
    /// Safe to call more than once.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        let count = inner.records.len();

        for record in inner.records.iter_mut() {
            if let Some(pair) = record.thread.take() {
                bootstrap::retire(&self.host, pair);
            }
        }

        inner.records = Vec::new();
        inner.capacity = 0;

        if count > 0 {
            log::info!("[KEEL Proc] Process table torn down ({} processes)", count);
        }
    }

    /// Get count of processes
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current logical capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Highest PID value ever inserted
    pub fn highest_pid(&self) -> u64 {
        self.inner.lock().highest_pid
    }

    /// Get a snapshot of all processes, in insertion order
    pub fn snapshot(&self) -> Vec<ProcessSnapshot> {
        self.inner
            .lock()
            .records
            .iter()
            .map(ProcessRecord::snapshot)
            .collect()
    }
}

impl<H: KernelHost> Drop for ProcessTable<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Longest prefix of `s` with at most `max` bytes, cut on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedHost;

    #[test]
    fn test_pid_parse() {
        assert_eq!(Pid::parse("42").value(), 42);
        assert_eq!(Pid::parse("12abc").value(), 12);
        assert_eq!(Pid::parse("abc").value(), 0);
        assert_eq!(Pid::parse("123456789").as_str(), "1234567");
        assert_eq!(Pid::parse("007"), Pid::from_value(7));
    }

    #[test]
    fn test_initialize() {
        let table = ProcessTable::initialize(SimulatedHost::new()).unwrap();
        assert_eq!(table.len(), 0);
        assert_eq!(table.capacity(), 10);
        assert!(table.is_empty());
    }

    #[test]
    fn test_name_truncated() {
        let table = ProcessTable::initialize(SimulatedHost::new()).unwrap();
        let long: String = core::iter::repeat('n').take(300).collect();

        let snap = table.add(&long, Pid::from_value(1), "1000", CodeEntry(0x1000)).unwrap();
        assert_eq!(snap.name.len(), PROCESS_NAME_MAX);
    }

    #[test]
    fn test_highest_pid_tracks_max() {
        let table = ProcessTable::initialize(SimulatedHost::new()).unwrap();
        table.add("a", Pid::from_value(5), "1", CodeEntry(0x1000)).unwrap();
        table.add("b", Pid::from_value(3), "1", CodeEntry(0x2000)).unwrap();
        assert_eq!(table.highest_pid(), 5);
    }

    #[test]
    fn test_truncate_char_boundary() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 8), "abc");
    }
}

//! Process Table Tests
//!
//! Growth policy, code replacement and teardown against the simulated host.

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use crate::error::{BootstrapStage, ProcessError};
    use crate::host::{HostCall, KernReturn, SimulatedHost};
    use crate::process::{CodeEntry, Pid, ProcessTable};

    fn table() -> (Arc<SimulatedHost>, ProcessTable<Arc<SimulatedHost>>) {
        let host = Arc::new(SimulatedHost::new());
        let table = ProcessTable::initialize(host.clone()).unwrap();
        (host, table)
    }

    fn fill(table: &ProcessTable<Arc<SimulatedHost>>, count: u64) {
        for i in 0..count {
            table
                .add(&format!("proc{}", i), Pid::from_value(i), "1000", CodeEntry(0x1000 + i * 0x100))
                .unwrap();
        }
    }

    // ========================================
    // Growth
    // ========================================

    #[test]
    fn test_initial_capacity() {
        let (_, table) = table();
        assert_eq!(table.len(), 0);
        assert_eq!(table.capacity(), 10);
    }

    #[test]
    fn test_ten_records_fit_without_growth() {
        let (_, table) = table();
        fill(&table, 10);
        assert_eq!(table.len(), 10);
        assert_eq!(table.capacity(), 10);
    }

    #[test]
    fn test_eleventh_record_doubles_once() {
        let (_, table) = table();
        fill(&table, 11);
        assert_eq!(table.len(), 11);
        assert_eq!(table.capacity(), 20);
    }

    #[test]
    fn test_twenty_first_record_doubles_again() {
        let (_, table) = table();
        fill(&table, 20);
        assert_eq!(table.capacity(), 20);
        fill_from(&table, 20, 1);
        assert_eq!(table.len(), 21);
        assert_eq!(table.capacity(), 40);
    }

    fn fill_from(table: &ProcessTable<Arc<SimulatedHost>>, start: u64, count: u64) {
        for i in start..start + count {
            table
                .add(&format!("proc{}", i), Pid::from_value(i), "1000", CodeEntry(0x1000 + i * 0x100))
                .unwrap();
        }
    }

    #[test]
    fn test_growth_preserves_order_and_contents() {
        let (_, table) = table();
        fill(&table, 10);
        let before = table.snapshot();

        fill_from(&table, 10, 11);
        let after = table.snapshot();

        assert_eq!(&after[..10], &before[..]);
        let pids: Vec<u64> = after.iter().map(|p| p.pid.value()).collect();
        let expected: Vec<u64> = (0..21).collect();
        assert_eq!(pids, expected);
    }

    #[test]
    fn test_failed_add_leaves_table_unchanged() {
        let (host, table) = table();
        fill(&table, 10);

        host.fail_next(HostCall::ThreadCreate, KernReturn::RESOURCE_SHORTAGE);
        let err = table
            .add("late", Pid::from_value(99), "1000", CodeEntry(0x9000))
            .unwrap_err();

        match err {
            ProcessError::ThreadBootstrapFailed(e) => assert_eq!(e.stage, BootstrapStage::CreateThread),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(table.len(), 10);
        assert_eq!(table.capacity(), 10);
        assert_eq!(table.highest_pid(), 9);
        assert_eq!(host.live_threads(), 10);
        assert_eq!(host.live_regions(), 10);
    }

    // ========================================
    // Lookup
    // ========================================

    #[test]
    fn test_lookups_first_match_wins() {
        let (_, table) = table();
        table.add("worker", Pid::from_value(1), "1000", CodeEntry(0x1000)).unwrap();
        table.add("worker", Pid::from_value(2), "1001", CodeEntry(0x1000)).unwrap();

        assert_eq!(table.find_by_name("worker").unwrap().pid.value(), 1);
        assert_eq!(table.find_by_code_entry(CodeEntry(0x1000)).unwrap().pid.value(), 1);
        assert_eq!(table.find_by_pid(2).unwrap().owner_uid, "1001");
    }

    #[test]
    fn test_lookups_absent() {
        let (_, table) = table();
        table.add("worker", Pid::from_value(1), "1000", CodeEntry(0x1000)).unwrap();

        assert!(table.find_by_name("nobody").is_none());
        assert!(table.find_by_pid(42).is_none());
        assert!(table.find_by_code_entry(CodeEntry(0xBEEF)).is_none());
    }

    // ========================================
    // Code replacement
    // ========================================

    #[test]
    fn test_replace_code_swaps_thread() {
        let (host, table) = table();
        let old = table.add("shell", Pid::parse("3"), "1000", CodeEntry(0x1000)).unwrap();
        let old_thread = old.thread.unwrap();
        let old_stack = old.stack.unwrap();

        table.replace_code(3, CodeEntry(0x2000)).unwrap();

        let new = table.find_by_pid(3).unwrap();
        assert_eq!(new.name, "shell");
        assert_eq!(new.pid, old.pid);
        assert_eq!(new.owner_uid, "1000");
        assert_eq!(new.code_entry, CodeEntry(0x2000));

        assert!(!host.is_thread_live(old_thread));
        assert!(!host.is_region_live(old_stack));
        assert_eq!(host.counters().terminations, 1);
        assert_eq!(host.counters().deallocations, 1);

        let ctx = host.context_of(new.thread.unwrap()).unwrap();
        assert_eq!(ctx.instruction_pointer(), 0x2000);
    }

    #[test]
    fn test_replace_code_unknown_pid() {
        let (host, table) = table();
        table.add("shell", Pid::from_value(3), "1000", CodeEntry(0x1000)).unwrap();
        let before = host.counters();

        assert_eq!(
            table.replace_code(4, CodeEntry(0x2000)),
            Err(ProcessError::ProcessNotFound)
        );
        assert_eq!(host.counters(), before);
        assert_eq!(table.find_by_pid(3).unwrap().code_entry, CodeEntry(0x1000));
    }

    #[test]
    fn test_replace_code_bootstrap_failure_leaves_dormant_record() {
        let (host, table) = table();
        table.add("shell", Pid::from_value(3), "1000", CodeEntry(0x1000)).unwrap();

        host.fail_next(HostCall::Resume, KernReturn::FAILURE);
        let err = table.replace_code(3, CodeEntry(0x2000)).unwrap_err();
        assert!(matches!(err, ProcessError::ThreadBootstrapFailed(_)));

        let record = table.find_by_pid(3).unwrap();
        assert!(record.thread.is_none());
        assert!(record.stack.is_none());
        assert_eq!(record.code_entry, CodeEntry(0x1000));
        assert_eq!(host.live_threads(), 0);
        assert_eq!(host.live_regions(), 0);

        // A later exec brings it back.
        table.replace_code(3, CodeEntry(0x3000)).unwrap();
        assert!(table.with_process(3, |r| r.is_live()).unwrap());
        assert_eq!(host.live_threads(), 1);
    }

    // ========================================
    // Teardown
    // ========================================

    #[test]
    fn test_teardown_releases_everything_once() {
        let (host, table) = table();
        fill(&table, 12);

        table.teardown();

        let counters = host.counters();
        assert_eq!(counters.terminations, 12);
        assert_eq!(counters.deallocations, 12);
        assert_eq!(host.live_threads(), 0);
        assert_eq!(host.live_regions(), 0);
        assert_eq!(table.len(), 0);

        table.teardown();
        assert_eq!(host.counters(), counters);
    }

    #[test]
    fn test_teardown_empty_table() {
        let (host, table) = table();
        table.teardown();
        table.teardown();
        assert_eq!(host.counters().terminations, 0);
    }

    #[test]
    fn test_teardown_skips_dormant_records() {
        let (host, table) = table();
        fill(&table, 2);
        host.fail_next(HostCall::Allocate, KernReturn::NO_SPACE);
        assert!(table.replace_code(0, CodeEntry(0x5000)).is_err());

        table.teardown();
        assert_eq!(host.counters().terminations, 2);
        assert_eq!(host.counters().deallocations, 2);
    }

    #[test]
    fn test_drop_tears_down() {
        let (host, table) = table();
        fill(&table, 3);
        drop(table);

        assert_eq!(host.live_threads(), 0);
        assert_eq!(host.live_regions(), 0);
        assert_eq!(host.counters().terminations, 3);
    }

    #[test]
    fn test_add_after_teardown() {
        let (host, table) = table();
        fill(&table, 2);
        table.teardown();

        table.add("again", Pid::from_value(7), "1", CodeEntry(0x1000)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.capacity(), 10);
        assert_eq!(host.live_threads(), 1);
    }
}

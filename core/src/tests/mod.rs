//! Subsystem Tests
//!
//! Cross-module tests for the process table, registry and syscalls.

mod process_tests;

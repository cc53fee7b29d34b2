//! Runtime configuration constants.
//!
//! Compile-time limits for the process table, thread stacks and the
//! permission registry. Field limits count stored characters; the
//! on-disk records they come from reserve one extra byte for a
//! terminator.

/// Page size (4 KB).
pub const PAGE_SIZE: usize = 4096;

/// Pages per process stack.
pub const STACK_PAGES: usize = 16;

/// Stack size per process thread (64 KB).
pub const STACK_SIZE: usize = STACK_PAGES * PAGE_SIZE;

/// Stack pointer alignment required by the System V ABI.
pub const STACK_ALIGN: u64 = 16;

/// Slot reserved below the aligned stack top (one return address).
pub const STACK_RESERVED_SLOT: u64 = 8;

/// Initial capacity of the process table.
pub const INITIAL_TABLE_CAPACITY: usize = 10;

/// Maximum number of user records in the permission registry.
pub const MAX_USERS: usize = 65536;

/// Maximum stored length of a process name.
pub const PROCESS_NAME_MAX: usize = 255;

/// Maximum stored length of a PID display string.
pub const PID_TEXT_MAX: usize = 7;

/// Maximum stored length of a username.
pub const USERNAME_MAX: usize = 127;

/// Maximum stored length of a UID or GID.
pub const ID_MAX: usize = 7;

/// Maximum stored length of a home directory path.
pub const HOME_MAX: usize = 511;

/// Maximum stored length of a shell path.
pub const SHELL_MAX: usize = 1023;

/// Maximum stored length of a permission string.
pub const PERMS_MAX: usize = 31;

/// Maximum stored length of a directory-access path.
pub const DIR_ACCESS_MAX: usize = 1023;

/// Name of the statically seeded kernel task.
pub const KERNEL_TASK_NAME: &str = "kernel_task";

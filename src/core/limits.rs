/*!
 * System Limits and Constants
 *
 * Centralized location for table capacities and POSIX-mandated maxima.
 * Linux-compatible values are marked with [LINUX-COMPAT]
 */

use std::time::Duration;

// =============================================================================
// HANDLE TABLES
// =============================================================================

/// Number of descriptor slots reserved for stdin, stdout and stderr
pub const RESERVED_STDIO_HANDLES: u32 = 3;

/// Default file-category capacity
/// [LINUX-COMPAT] Matches the default RLIMIT_NOFILE soft limit
pub const DEFAULT_MAX_FILE_HANDLES: u32 = 1024;

/// Default sync-category capacity
pub const DEFAULT_MAX_SYNC_HANDLES: u32 = 65_536;

// =============================================================================
// SYNCHRONIZATION
// =============================================================================

/// Maximum count a semaphore may reach
/// [LINUX-COMPAT] SEM_VALUE_MAX on glibc
pub const SEM_VALUE_MAX: u32 = i32::MAX as u32;

/// Maximum lock depth of a recursive mutex
pub const MUTEX_MAX_RECURSION: u32 = i32::MAX as u32;

/// Stack size for threads started through `thread_create`
pub const THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// TIME
// =============================================================================

pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Upper bound on a single host wait; longer deadlines are waited in slices
pub const MAX_WAIT_SLICE: Duration = Duration::from_secs(60 * 60);

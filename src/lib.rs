/*!
 * POSIX Compatibility Layer
 *
 * Handle tables and emulated synchronization primitives that give legacy
 * POSIX-style code file descriptors, mutexes, condition variables,
 * semaphores, once guards, joinable threads and `va_list` argument passing
 * on top of a host that offers none of them natively.
 *
 * `Runtime` is the typed entry point; `abi` wraps it in C-shaped calls.
 */

pub mod abi;
pub mod config;
pub mod core;
pub mod handles;
pub mod monitoring;
pub mod resources;
pub mod runtime;
pub mod sync;
pub mod varargs;
pub mod vfs;

// Re-exports
pub use config::RuntimeConfig;
pub use crate::core::errors::{PosixError, PosixResult, Target};
pub use crate::core::id::{Handle, HandleCategory};
pub use crate::core::time::{Deadline, Timespec};
pub use handles::HandleTable;
pub use monitoring::init_tracing;
pub use resources::{Resource, ResourceKind};
pub use runtime::{Runtime, RuntimeBuilder, Whence};
pub use sync::{
    JoinTarget, MutexAttr, MutexKind, OnceGuard, PosixCondvar, PosixMutex, Semaphore, WakeResult,
};
pub use varargs::{ArgList, FromVaArg, VaArg};
pub use vfs::{FileSystem, LocalFS, MemFS, OpenFile, OpenFlags};

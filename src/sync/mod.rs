/*!
 * Synchronization Primitives
 *
 * POSIX mutex, condition variable, semaphore, once and join semantics built
 * on parking_lot. Every primitive reports failures as `PosixError` values
 * instead of panicking or poisoning.
 */

mod condvar;
mod mutex;
mod once;
mod semaphore;
mod thread;
mod wake;

pub use condvar::PosixCondvar;
pub use mutex::{
    MutexAttr, MutexKind, PosixMutex, PTHREAD_MUTEX_DEFAULT, PTHREAD_MUTEX_NORMAL,
    PTHREAD_MUTEX_RECURSIVE,
};
pub use once::OnceGuard;
pub use semaphore::Semaphore;
pub use thread::JoinTarget;
pub use wake::WakeResult;

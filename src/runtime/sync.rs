/*!
 * Synchronization Operations
 * Mutex, condvar, semaphore, once and thread calls dispatched through the sync table
 */

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::Runtime;
use crate::core::errors::{PosixError, PosixResult};
use crate::core::id::{Handle, HandleCategory};
use crate::core::time::{Deadline, Timespec};
use crate::resources::{Resource, ResourceKind};
use crate::sync::{
    JoinTarget, MutexAttr, OnceGuard, PosixCondvar, PosixMutex, Semaphore, WakeResult,
};

impl Runtime {
    fn sync_object(&self, handle: Handle) -> PosixResult<Arc<Resource>> {
        self.resolve(HandleCategory::Sync, handle)
    }

    /// Release a sync handle of the given kind, refusing while it is in use
    fn destroy(&self, handle: Handle, expected: ResourceKind) -> PosixResult<()> {
        let resource = self.sync_object(handle)?;
        if resource.kind() != expected {
            return Err(PosixError::invalid(format!(
                "handle {} names a {}, expected a {}",
                handle,
                resource.kind(),
                expected
            )));
        }

        // Busy is decided under the entry lock, atomically with the removal
        self.sync
            .release_checked(handle, &resource, |current| {
                if current.is_busy() {
                    warn!(handle = %handle, kind = %expected, "destroy of a busy resource refused");
                    Err(PosixError::Busy)
                } else {
                    Ok(())
                }
            })?;
        debug!(handle = %handle, kind = %expected, "resource destroyed");
        Ok(())
    }

    // =========================================================================
    // MUTEX
    // =========================================================================

    pub fn mutex_init(&self, attr: &MutexAttr) -> Handle {
        self.register(Resource::Mutex(PosixMutex::new(attr)))
    }

    #[instrument(level = "debug", skip(self), fields(handle = %handle))]
    pub fn mutex_lock(&self, handle: Handle) -> PosixResult<()> {
        self.sync_object(handle)?.as_mutex()?.lock()
    }

    pub fn mutex_try_lock(&self, handle: Handle) -> PosixResult<()> {
        self.sync_object(handle)?.as_mutex()?.try_lock()
    }

    #[instrument(level = "debug", skip(self), fields(handle = %handle))]
    pub fn mutex_timed_lock(&self, handle: Handle, abstime: &Timespec) -> PosixResult<()> {
        let deadline = Deadline::from_timespec(abstime)?;
        self.sync_object(handle)?.as_mutex()?.timed_lock(&deadline)
    }

    pub fn mutex_unlock(&self, handle: Handle) -> PosixResult<()> {
        self.sync_object(handle)?.as_mutex()?.unlock()
    }

    /// `Busy` while any context holds the mutex
    pub fn mutex_destroy(&self, handle: Handle) -> PosixResult<()> {
        self.destroy(handle, ResourceKind::Mutex)
    }

    // =========================================================================
    // CONDITION VARIABLE
    // =========================================================================

    pub fn cond_init(&self) -> Handle {
        self.register(Resource::CondVar(PosixCondvar::new()))
    }

    #[instrument(level = "debug", skip(self), fields(cond = %cond, mutex = %mutex))]
    pub fn cond_wait(&self, cond: Handle, mutex: Handle) -> PosixResult<()> {
        let cv = self.sync_object(cond)?;
        let m = self.sync_object(mutex)?;
        cv.as_condvar()?.wait(m.as_mutex()?)
    }

    #[instrument(level = "debug", skip(self), fields(cond = %cond, mutex = %mutex))]
    pub fn cond_timed_wait(&self, cond: Handle, mutex: Handle, abstime: &Timespec) -> PosixResult<()> {
        let deadline = Deadline::from_timespec(abstime)?;
        let cv = self.sync_object(cond)?;
        let m = self.sync_object(mutex)?;
        cv.as_condvar()?.timed_wait(m.as_mutex()?, &deadline)
    }

    pub fn cond_signal(&self, cond: Handle) -> PosixResult<WakeResult> {
        let woken = self.sync_object(cond)?.as_condvar()?.signal();
        debug!(cond = %cond, woken = %woken, "condvar signalled");
        Ok(woken)
    }

    pub fn cond_broadcast(&self, cond: Handle) -> PosixResult<WakeResult> {
        let woken = self.sync_object(cond)?.as_condvar()?.broadcast();
        debug!(cond = %cond, woken = %woken, "condvar broadcast");
        Ok(woken)
    }

    /// Threads currently blocked on the condvar (diagnostic)
    pub fn cond_waiters(&self, cond: Handle) -> PosixResult<usize> {
        Ok(self.sync_object(cond)?.as_condvar()?.waiter_count())
    }

    /// `Busy` while any context waits on the condvar
    pub fn cond_destroy(&self, cond: Handle) -> PosixResult<()> {
        self.destroy(cond, ResourceKind::CondVar)
    }

    // =========================================================================
    // SEMAPHORE
    // =========================================================================

    /// Create a semaphore holding `value`; negative values are rejected
    pub fn sem_init(&self, value: i64) -> PosixResult<Handle> {
        let sem = Semaphore::new(value)?;
        Ok(self.register(Resource::Semaphore(sem)))
    }

    pub fn sem_post(&self, handle: Handle) -> PosixResult<()> {
        self.sync_object(handle)?.as_semaphore()?.post()
    }

    #[instrument(level = "debug", skip(self), fields(handle = %handle))]
    pub fn sem_wait(&self, handle: Handle) -> PosixResult<()> {
        self.sync_object(handle)?.as_semaphore()?.wait()
    }

    pub fn sem_try_wait(&self, handle: Handle) -> PosixResult<()> {
        self.sync_object(handle)?.as_semaphore()?.try_wait()
    }

    #[instrument(level = "debug", skip(self), fields(handle = %handle))]
    pub fn sem_timed_wait(&self, handle: Handle, abstime: &Timespec) -> PosixResult<()> {
        let deadline = Deadline::from_timespec(abstime)?;
        self.sync_object(handle)?.as_semaphore()?.timed_wait(&deadline)
    }

    /// Advisory count: may be stale by the time the caller reads it
    pub fn sem_get_value(&self, handle: Handle) -> PosixResult<u32> {
        Ok(self.sync_object(handle)?.as_semaphore()?.value())
    }

    /// `Busy` while any context waits on the semaphore
    pub fn sem_destroy(&self, handle: Handle) -> PosixResult<()> {
        self.destroy(handle, ResourceKind::Semaphore)
    }

    // =========================================================================
    // ONCE
    // =========================================================================

    /// Allocate a once guard for call sites that cannot use a `static`
    pub fn once_init(&self) -> Handle {
        self.register(Resource::Once(OnceGuard::new()))
    }

    #[instrument(level = "debug", skip(self, action), fields(handle = %handle))]
    pub fn once<F: FnOnce()>(&self, handle: Handle, action: F) -> PosixResult<()> {
        self.sync_object(handle)?.as_once()?.call(action);
        Ok(())
    }

    // =========================================================================
    // THREADS
    // =========================================================================

    /// Start `routine` on a new thread and return its join handle
    pub fn thread_create<F>(&self, routine: F) -> PosixResult<Handle>
    where
        F: FnOnce() -> usize + Send + 'static,
    {
        let seq = self.thread_seq.fetch_add(1, Ordering::Relaxed);
        let target = JoinTarget::spawn(format!("posix-thread-{}", seq), routine)?;
        Ok(self.register(Resource::JoinTarget(target)))
    }

    /// Wait for the thread and return its result; the handle is released
    #[instrument(level = "debug", skip(self), fields(handle = %handle))]
    pub fn thread_join(&self, handle: Handle) -> PosixResult<usize> {
        self.join_inner(handle, None)
    }

    /// Timed join: `TimedOut` leaves the handle joinable
    #[instrument(level = "debug", skip(self), fields(handle = %handle))]
    pub fn thread_timed_join(&self, handle: Handle, abstime: &Timespec) -> PosixResult<usize> {
        let deadline = Deadline::from_timespec(abstime)?;
        self.join_inner(handle, Some(&deadline))
    }

    /// Release the handle without waiting; the thread keeps running
    pub fn thread_detach(&self, handle: Handle) -> PosixResult<()> {
        let resolved = self.sync_object(handle)?;
        resolved.as_join_target()?;
        let resource = self.sync.release_if(handle, &resolved)?;
        if let Resource::JoinTarget(target) = resource.as_ref() {
            target.detach();
            debug!(handle = %handle, thread = target.name(), "thread detached");
        }
        Ok(())
    }

    fn join_inner(&self, handle: Handle, deadline: Option<&Deadline>) -> PosixResult<usize> {
        let resource = self.sync_object(handle)?;
        let result = resource.as_join_target()?.join(deadline);

        if matches!(result, Err(PosixError::TimedOut)) {
            return result;
        }

        // Joined (or found panicked); the handle is spent either way. A
        // concurrent joiner may have released it first, possibly followed by
        // a reuse of the value, which must be left alone.
        if let Err(e) = self.sync.release_if(handle, &resource) {
            debug!(handle = %handle, error = %e, "join target already released");
        }
        debug!(handle = %handle, ok = result.is_ok(), "thread joined");
        result
    }
}

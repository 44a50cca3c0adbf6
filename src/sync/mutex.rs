/*!
 * Mutex Emulation
 * POSIX mutex ownership and timing semantics on top of parking_lot
 */

use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};
use tracing::warn;

use crate::core::errors::{PosixError, PosixResult};
use crate::core::limits::MUTEX_MAX_RECURSION;
use crate::core::time::Deadline;

pub const PTHREAD_MUTEX_NORMAL: i32 = 0;
pub const PTHREAD_MUTEX_RECURSIVE: i32 = 1;
pub const PTHREAD_MUTEX_DEFAULT: i32 = PTHREAD_MUTEX_NORMAL;

/// Mutex flavor, fixed at init time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutexKind {
    /// Relocking by the owner blocks
    #[default]
    Normal,
    /// Relocking by the owner increments the depth
    Recursive,
}

/// `pthread_mutexattr_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutexAttr {
    kind: MutexKind,
}

impl MutexAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive() -> Self {
        Self {
            kind: MutexKind::Recursive,
        }
    }

    /// Select the flavor from a `PTHREAD_MUTEX_*` constant
    pub fn set_type(&mut self, typ: i32) -> PosixResult<()> {
        self.kind = match typ {
            PTHREAD_MUTEX_NORMAL => MutexKind::Normal,
            PTHREAD_MUTEX_RECURSIVE => MutexKind::Recursive,
            other => return Err(PosixError::invalid(format!("unsupported mutex type {}", other))),
        };
        Ok(())
    }

    #[inline]
    pub fn kind(&self) -> MutexKind {
        self.kind
    }
}

#[derive(Debug, Default)]
struct MutexState {
    owner: Option<ThreadId>,
    depth: u32,
}

/// POSIX-style mutex
///
/// Unlike a guard-based lock, ownership is tracked per thread and released
/// by an explicit `unlock`, so a lock may be taken in one call and dropped in
/// another.
///
/// A `Normal` mutex relocked by its owner blocks forever (or until the
/// deadline of a timed lock). This mirrors the default POSIX type, which does
/// not detect self-deadlock.
#[derive(Debug)]
pub struct PosixMutex {
    kind: MutexKind,
    state: Mutex<MutexState>,
    released: Condvar,
}

impl PosixMutex {
    pub fn new(attr: &MutexAttr) -> Self {
        Self {
            kind: attr.kind(),
            state: Mutex::new(MutexState::default()),
            released: Condvar::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> MutexKind {
        self.kind
    }

    /// Block until owned
    pub fn lock(&self) -> PosixResult<()> {
        self.acquire(None)
    }

    /// Block until owned or `TimedOut` once `deadline` passes
    pub fn timed_lock(&self, deadline: &Deadline) -> PosixResult<()> {
        self.acquire(Some(deadline))
    }

    /// Take the lock only if it is free right now
    pub fn try_lock(&self) -> PosixResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        match state.owner {
            Some(owner) if owner == me && self.kind == MutexKind::Recursive => {
                Self::deepen(&mut state)
            }
            Some(_) => Err(PosixError::Busy),
            None => {
                state.owner = Some(me);
                state.depth = 1;
                Ok(())
            }
        }
    }

    pub fn unlock(&self) -> PosixResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.owner != Some(me) {
            warn!(owner = ?state.owner, caller = ?me, "unlock of a mutex not owned by caller");
            return Err(PosixError::invalid("mutex not owned by caller"));
        }

        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
        Ok(())
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Lock depth held by the calling thread (0 if it is not the owner)
    pub fn depth(&self) -> u32 {
        let state = self.state.lock();
        if state.owner == Some(thread::current().id()) {
            state.depth
        } else {
            0
        }
    }

    /// Drop ownership entirely for a condition wait, returning the depth to restore
    pub(crate) fn release_for_wait(&self) -> PosixResult<u32> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.owner != Some(me) {
            return Err(PosixError::invalid("condition wait without owning the mutex"));
        }

        let depth = state.depth;
        state.owner = None;
        state.depth = 0;
        drop(state);
        self.released.notify_one();
        Ok(depth)
    }

    /// Re-take ownership after a condition wait
    pub(crate) fn reacquire(&self, depth: u32) {
        let mut state = self.state.lock();
        while state.owner.is_some() {
            self.released.wait(&mut state);
        }
        state.owner = Some(thread::current().id());
        state.depth = depth;
    }

    fn acquire(&self, deadline: Option<&Deadline>) -> PosixResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.owner == Some(me) && self.kind == MutexKind::Recursive {
            return Self::deepen(&mut state);
        }

        while state.owner.is_some() {
            match deadline {
                None => self.released.wait(&mut state),
                Some(deadline) => {
                    if deadline.expired() {
                        return Err(PosixError::TimedOut);
                    }
                    self.released.wait_until(&mut state, deadline.next_wake());
                }
            }
        }

        state.owner = Some(me);
        state.depth = 1;
        Ok(())
    }

    fn deepen(state: &mut MutexState) -> PosixResult<()> {
        if state.depth >= MUTEX_MAX_RECURSION {
            return Err(PosixError::WouldBlock);
        }
        state.depth += 1;
        Ok(())
    }
}

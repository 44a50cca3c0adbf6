/*!
 * Semaphore Emulation
 * Counting semaphore with blocking, non-blocking and deadline-bounded waits
 */

use parking_lot::{Condvar, Mutex};

use crate::core::errors::{PosixError, PosixResult};
use crate::core::limits::SEM_VALUE_MAX;
use crate::core::time::Deadline;

#[derive(Debug)]
struct SemState {
    count: u32,
    waiters: usize,
}

/// POSIX-style counting semaphore
///
/// The count never goes negative: every decrement happens under the state
/// lock together with the check that the count is positive. Waiter order is
/// unspecified.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<SemState>,
    available: Condvar,
}

impl Semaphore {
    /// Create with an initial count; negative or above SEM_VALUE_MAX is rejected
    pub fn new(value: i64) -> PosixResult<Self> {
        if value < 0 || value > SEM_VALUE_MAX as i64 {
            return Err(PosixError::invalid(format!(
                "semaphore value out of range: {}",
                value
            )));
        }
        Ok(Self {
            state: Mutex::new(SemState {
                count: value as u32,
                waiters: 0,
            }),
            available: Condvar::new(),
        })
    }

    /// Increment the count and wake one waiter
    pub fn post(&self) -> PosixResult<()> {
        let mut state = self.state.lock();
        if state.count >= SEM_VALUE_MAX {
            return Err(PosixError::invalid("semaphore count overflow"));
        }
        state.count += 1;
        let has_waiters = state.waiters > 0;
        drop(state);

        if has_waiters {
            self.available.notify_one();
        }
        Ok(())
    }

    /// Block until the count is positive, then decrement it
    pub fn wait(&self) -> PosixResult<()> {
        self.wait_inner(None)
    }

    /// Decrement if positive, otherwise `WouldBlock`
    pub fn try_wait(&self) -> PosixResult<()> {
        let mut state = self.state.lock();
        if state.count == 0 {
            return Err(PosixError::WouldBlock);
        }
        state.count -= 1;
        Ok(())
    }

    /// Like `wait`, but gives up with `TimedOut` at `deadline`
    pub fn timed_wait(&self, deadline: &Deadline) -> PosixResult<()> {
        self.wait_inner(Some(deadline))
    }

    /// Instantaneous count
    ///
    /// Advisory only: the value may be stale as soon as this returns.
    pub fn value(&self) -> u32 {
        self.state.lock().count
    }

    /// Number of threads blocked in `wait`/`timed_wait` (diagnostic)
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters
    }

    fn wait_inner(&self, deadline: Option<&Deadline>) -> PosixResult<()> {
        let mut state = self.state.lock();
        state.waiters += 1;

        while state.count == 0 {
            match deadline {
                None => self.available.wait(&mut state),
                Some(deadline) => {
                    if deadline.expired() {
                        state.waiters -= 1;
                        return Err(PosixError::TimedOut);
                    }
                    self.available.wait_until(&mut state, deadline.next_wake());
                }
            }
        }

        state.waiters -= 1;
        state.count -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_init_range() {
        assert!(Semaphore::new(-1).is_err());
        assert!(Semaphore::new(SEM_VALUE_MAX as i64 + 1).is_err());
        assert_eq!(Semaphore::new(3).unwrap().value(), 3);
    }

    #[test]
    fn test_try_wait_until_empty() {
        let sem = Semaphore::new(2).unwrap();
        sem.try_wait().unwrap();
        sem.try_wait().unwrap();
        assert_eq!(sem.try_wait(), Err(PosixError::WouldBlock));
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_post_overflow() {
        let sem = Semaphore::new(SEM_VALUE_MAX as i64).unwrap();
        assert!(matches!(sem.post(), Err(PosixError::InvalidArgument(_))));
        assert_eq!(sem.value(), SEM_VALUE_MAX);
    }

    #[test]
    fn test_post_wakes_blocked_waiter() {
        let sem = Arc::new(Semaphore::new(0).unwrap());
        let sem2 = sem.clone();
        let waiter = thread::spawn(move || sem2.wait());

        while sem.waiter_count() == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        sem.post().unwrap();

        assert!(waiter.join().unwrap().is_ok());
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_timed_wait_expires() {
        let sem = Semaphore::new(0).unwrap();
        let start = Instant::now();
        let result = sem.timed_wait(&Deadline::after(Duration::from_millis(40)));

        assert_eq!(result, Err(PosixError::TimedOut));
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(sem.waiter_count(), 0);
    }
}

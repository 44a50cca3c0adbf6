/*!
 * Condition Variable Emulation
 *
 * Waits are paired with an external `PosixMutex` supplied per call.
 *
 * # Design
 *
 * Every waiter takes a ticket and queues it while holding the queue lock,
 * and only then releases the caller's mutex. A signaller needs the same
 * queue lock, so no signal can fall between "mutex released" and "waiter
 * queued". `signal` moves the oldest ticket to the woken set, `broadcast`
 * moves all of them; a notification with an empty queue is simply dropped.
 */

use ahash::RandomState;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashSet, VecDeque};

use super::mutex::PosixMutex;
use super::wake::WakeResult;
use crate::core::errors::{PosixError, PosixResult};
use crate::core::time::Deadline;

#[derive(Debug, Default)]
struct CondState {
    next_ticket: u64,
    queue: VecDeque<u64>,
    woken: HashSet<u64, RandomState>,
}

/// POSIX-style condition variable
#[derive(Debug, Default)]
pub struct PosixCondvar {
    state: Mutex<CondState>,
    wakeup: Condvar,
}

impl PosixCondvar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release `mutex`, sleep until signalled, then reacquire `mutex`
    ///
    /// The caller must own `mutex`. Callers should still re-check their
    /// predicate after returning.
    pub fn wait(&self, mutex: &PosixMutex) -> PosixResult<()> {
        self.wait_inner(mutex, None)
    }

    /// Like `wait`, but gives up at `deadline`
    ///
    /// The mutex is reacquired whatever the outcome; `TimedOut` is returned
    /// only when no signal arrived before the deadline.
    pub fn timed_wait(&self, mutex: &PosixMutex, deadline: &Deadline) -> PosixResult<()> {
        self.wait_inner(mutex, Some(deadline))
    }

    /// Wake at most one current waiter
    pub fn signal(&self) -> WakeResult {
        let mut state = self.state.lock();
        let Some(ticket) = state.queue.pop_front() else {
            return WakeResult::NoWaiters;
        };
        state.woken.insert(ticket);
        drop(state);

        self.wakeup.notify_all();
        WakeResult::Woken(1)
    }

    /// Wake every current waiter
    pub fn broadcast(&self) -> WakeResult {
        let mut state = self.state.lock();
        let waiting: Vec<u64> = state.queue.drain(..).collect();
        let count = waiting.len();
        state.woken.extend(waiting);
        drop(state);

        if count > 0 {
            self.wakeup.notify_all();
        }
        WakeResult::from_count(count)
    }

    /// Number of threads currently queued (diagnostic)
    pub fn waiter_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn wait_inner(&self, mutex: &PosixMutex, deadline: Option<&Deadline>) -> PosixResult<()> {
        let mut state = self.state.lock();
        let depth = mutex.release_for_wait()?;

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.queue.push_back(ticket);

        let outcome = loop {
            if state.woken.remove(&ticket) {
                break Ok(());
            }
            match deadline {
                None => self.wakeup.wait(&mut state),
                Some(deadline) => {
                    if deadline.expired() {
                        state.queue.retain(|t| *t != ticket);
                        break Err(PosixError::TimedOut);
                    }
                    self.wakeup.wait_until(&mut state, deadline.next_wake());
                }
            }
        };
        drop(state);

        mutex.reacquire(depth);
        outcome
    }
}

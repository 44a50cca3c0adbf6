/*!
 * Thread Join Targets
 * Host threads started on behalf of `pthread_create`, joinable with an optional deadline
 */

use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::core::errors::{PosixError, PosixResult};
use crate::core::limits::THREAD_STACK_SIZE;
use crate::core::time::Deadline;

#[derive(Debug)]
enum Outcome {
    Running,
    Returned(usize),
    Panicked(String),
    Joined,
}

#[derive(Debug)]
struct Completion {
    outcome: Mutex<Outcome>,
    finished: Condvar,
}

impl Completion {
    fn finish(&self, outcome: Outcome) {
        *self.outcome.lock() = outcome;
        self.finished.notify_all();
    }
}

/// A running (or finished) routine that can be joined once
#[derive(Debug)]
pub struct JoinTarget {
    name: String,
    completion: Arc<Completion>,
    host: Mutex<Option<JoinHandle<()>>>,
}

impl JoinTarget {
    /// Start `routine` on a new host thread
    pub fn spawn<F>(name: impl Into<String>, routine: F) -> PosixResult<Self>
    where
        F: FnOnce() -> usize + Send + 'static,
    {
        let name = name.into();
        let completion = Arc::new(Completion {
            outcome: Mutex::new(Outcome::Running),
            finished: Condvar::new(),
        });

        let shared = completion.clone();
        let host = thread::Builder::new()
            .name(name.clone())
            .stack_size(THREAD_STACK_SIZE)
            .spawn(move || {
                let outcome = match panic::catch_unwind(AssertUnwindSafe(routine)) {
                    Ok(value) => Outcome::Returned(value),
                    Err(payload) => Outcome::Panicked(panic_message(payload.as_ref())),
                };
                shared.finish(outcome);
            })
            .map_err(|e| PosixError::from_io(e, None))?;

        debug!(thread = %name, "thread started");
        Ok(Self {
            name,
            completion,
            host: Mutex::new(Some(host)),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        !matches!(*self.completion.outcome.lock(), Outcome::Running)
    }

    /// Wait for the routine and take its return value
    ///
    /// With a deadline, `TimedOut` leaves the target joinable. A routine that
    /// panicked yields `InvalidArgument`, and a second join of the same target
    /// is `InvalidArgument` as well.
    pub fn join(&self, deadline: Option<&Deadline>) -> PosixResult<usize> {
        let mut outcome = self.completion.outcome.lock();

        while matches!(*outcome, Outcome::Running) {
            match deadline {
                None => self.completion.finished.wait(&mut outcome),
                Some(deadline) => {
                    if deadline.expired() {
                        return Err(PosixError::TimedOut);
                    }
                    self.completion
                        .finished
                        .wait_until(&mut outcome, deadline.next_wake());
                }
            }
        }

        let result = match std::mem::replace(&mut *outcome, Outcome::Joined) {
            Outcome::Returned(value) => Ok(value),
            Outcome::Panicked(msg) => {
                warn!(thread = %self.name, panic = %msg, "joined thread had panicked");
                Err(PosixError::invalid(format!("thread panicked: {}", msg)))
            }
            Outcome::Joined | Outcome::Running => Err(PosixError::invalid("thread already joined")),
        };
        drop(outcome);

        // The routine is done; reap the host thread so it does not linger
        if let Some(host) = self.host.lock().take() {
            let _ = host.join();
        }
        result
    }

    /// Give up the right to join; the host thread runs to completion on its own
    pub fn detach(&self) {
        self.host.lock().take();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

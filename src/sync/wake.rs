/*!
 * Wake Results
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a `signal` or `broadcast` accomplished
///
/// `NoWaiters` means the notification was dropped: condition variables do
/// not remember signals sent while nobody waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeResult {
    Woken(usize),
    NoWaiters,
}

impl WakeResult {
    pub(crate) fn from_count(woken: usize) -> Self {
        match woken {
            0 => WakeResult::NoWaiters,
            n => WakeResult::Woken(n),
        }
    }

    /// Waiters released by the notification
    #[inline]
    pub fn count(self) -> usize {
        match self {
            WakeResult::Woken(n) => n,
            WakeResult::NoWaiters => 0,
        }
    }

    #[inline]
    pub fn was_dropped(self) -> bool {
        self == WakeResult::NoWaiters
    }
}

impl fmt::Display for WakeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeResult::Woken(n) => write!(f, "woke {} waiter(s)", n),
            WakeResult::NoWaiters => f.write_str("dropped, no waiters"),
        }
    }
}

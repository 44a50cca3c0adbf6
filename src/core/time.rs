/*!
 * Absolute Deadlines
 * `timespec`-shaped absolute times and their conversion to bounded host waits
 */

use super::errors::{PosixError, PosixResult};
use super::limits::{MAX_WAIT_SLICE, NANOS_PER_SEC};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Absolute CLOCK_REALTIME time, as passed to the `timed*` calls
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timespec {
    pub tv_sec: i64,
    pub tv_nsec: i64,
}

impl Timespec {
    #[inline]
    pub const fn new(tv_sec: i64, tv_nsec: i64) -> Self {
        Self { tv_sec, tv_nsec }
    }

    /// Current realtime clock reading
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Realtime clock reading `delay` from now
    pub fn from_now(delay: Duration) -> Self {
        Self::from_system_time(SystemTime::now() + delay)
    }

    fn from_system_time(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos() as i64),
            Err(e) => {
                let d = e.duration();
                let mut sec = -(d.as_secs() as i64);
                let mut nsec = -(d.subsec_nanos() as i64);
                if nsec < 0 {
                    sec -= 1;
                    nsec += NANOS_PER_SEC;
                }
                Self::new(sec, nsec)
            }
        }
    }

    /// Convert to a host time, rejecting a malformed nanosecond field
    pub fn to_system_time(self) -> PosixResult<SystemTime> {
        if !(0..NANOS_PER_SEC).contains(&self.tv_nsec) {
            return Err(PosixError::invalid(format!(
                "tv_nsec out of range: {}",
                self.tv_nsec
            )));
        }

        let t = if self.tv_sec >= 0 {
            UNIX_EPOCH.checked_add(Duration::new(self.tv_sec as u64, self.tv_nsec as u32))
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(self.tv_sec.unsigned_abs()))
                .and_then(|t| t.checked_add(Duration::from_nanos(self.tv_nsec as u64)))
        };
        // Unrepresentable far-future deadlines saturate, far-past ones are simply expired
        Ok(t.unwrap_or(if self.tv_sec >= 0 {
            SystemTime::now() + Duration::from_secs(u32::MAX as u64)
        } else {
            UNIX_EPOCH
        }))
    }
}

/// Absolute deadline measured against the realtime clock
///
/// A wait is only reported as timed out once the realtime clock has passed
/// the deadline, so a timeout is never reported early even if the host wait
/// primitive wakes up ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: SystemTime,
}

impl Deadline {
    pub fn from_timespec(ts: &Timespec) -> PosixResult<Self> {
        Ok(Self {
            at: ts.to_system_time()?,
        })
    }

    pub fn after(delay: Duration) -> Self {
        Self {
            at: SystemTime::now() + delay,
        }
    }

    /// Time left, zero once expired
    pub fn remaining(&self) -> Duration {
        self.at
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Instant at which the next bounded host wait should give up
    pub fn next_wake(&self) -> Instant {
        Instant::now() + self.remaining().min(MAX_WAIT_SLICE)
    }
}

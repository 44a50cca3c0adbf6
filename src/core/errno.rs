/*!
 * errno Side Channel
 * Thread-local error code for calls following the `-1 + errno` convention
 */

use super::errors::PosixError;
use nix::errno::Errno;
use std::cell::Cell;

thread_local! {
    static ERRNO: Cell<i32> = const { Cell::new(0) };
}

/// Current thread's errno
#[inline]
pub fn errno() -> i32 {
    ERRNO.with(|e| e.get())
}

#[inline]
pub fn set_errno(code: i32) {
    ERRNO.with(|e| e.set(code));
}

/// Record `err` in errno and return the `-1` sentinel
#[inline]
pub fn fail(err: &PosixError) -> i32 {
    set_errno(err.errno());
    -1
}

/// Human-readable description of an errno value
pub fn strerror(code: i32) -> &'static str {
    if code == 0 {
        return "Success";
    }
    Errno::from_raw(code).desc()
}

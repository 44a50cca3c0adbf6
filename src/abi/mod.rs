/*!
 * POSIX Call Surface
 *
 * C-shaped entry points over a `Runtime`. Two return conventions apply, as
 * in POSIX itself:
 *
 * - `unistd`, `dirent` and `semaphore` calls return `-1` (or a null-like
 *   `None`) on failure and leave the code in the thread-local errno
 * - `pthread` calls return the error code directly and never touch errno
 *
 * Handles cross this boundary as plain `c_int` values.
 */

pub mod dirent;
pub mod pthread;
pub mod semaphore;
pub mod unistd;

pub use crate::core::errno::{errno, set_errno, strerror};

use std::ffi::{c_int, CStr, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::core::errno::fail;
use crate::core::errors::PosixResult;
use crate::monitoring::CallSpan;

/// errno convention: value on success, `-1` with errno set on failure
#[inline]
fn errno_ret<T, F>(span: CallSpan, result: PosixResult<T>, ok: F) -> c_int
where
    F: FnOnce(T) -> c_int,
{
    match span.finish(result) {
        Ok(value) => ok(value),
        Err(err) => fail(&err),
    }
}

/// pthread convention: `0` on success, the error code otherwise
#[inline]
fn code_ret(span: CallSpan, result: PosixResult<()>) -> c_int {
    match span.finish(result) {
        Ok(()) => 0,
        Err(err) => err.errno(),
    }
}

#[inline]
fn c_path(path: &CStr) -> &Path {
    Path::new(OsStr::from_bytes(path.to_bytes()))
}

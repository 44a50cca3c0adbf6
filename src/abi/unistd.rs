/*!
 * unistd / fcntl / stdio calls
 */

use std::ffi::{c_int, CStr};

use super::{c_path, errno_ret};
use crate::core::errno::fail;
use crate::core::errors::PosixError;
use crate::core::id::Handle;
use crate::monitoring::CallSpan;
use crate::runtime::{Runtime, Whence};
use crate::vfs::OpenFlags;

pub use crate::runtime::{SEEK_CUR, SEEK_END, SEEK_SET};

/// `open(2)`; `flags` carries the `O_*` bits
pub fn open(rt: &Runtime, path: &CStr, flags: c_int) -> c_int {
    let span = CallSpan::new("open");
    let result = OpenFlags::from_posix(flags)
        .ok_or_else(|| PosixError::invalid(format!("invalid open flags {:#o}", flags)))
        .and_then(|flags| rt.open(c_path(path), flags));
    errno_ret(span, result, |h| h.raw())
}

/// `fopen(3)`-style open returning a descriptor instead of a `FILE*`
pub fn fopen(rt: &Runtime, path: &CStr, mode: &CStr) -> c_int {
    let span = CallSpan::new("fopen");
    let result = mode
        .to_str()
        .map_err(|_| PosixError::invalid("open mode is not UTF-8"))
        .and_then(|mode| rt.open_mode(c_path(path), mode));
    errno_ret(span, result, |h| h.raw())
}

pub fn close(rt: &Runtime, fd: c_int) -> c_int {
    let span = CallSpan::new("close");
    span.record_handle(fd);
    errno_ret(span, rt.close(Handle(fd)), |_| 0)
}

/// Bytes read, `0` at end of file, `-1` on failure
pub fn read(rt: &Runtime, fd: c_int, buf: &mut [u8]) -> isize {
    let span = CallSpan::new("read");
    span.record_handle(fd);
    match span.finish(rt.read(Handle(fd), buf)) {
        Ok(n) => n as isize,
        Err(err) => fail(&err) as isize,
    }
}

pub fn write(rt: &Runtime, fd: c_int, buf: &[u8]) -> isize {
    let span = CallSpan::new("write");
    span.record_handle(fd);
    match span.finish(rt.write(Handle(fd), buf)) {
        Ok(n) => n as isize,
        Err(err) => fail(&err) as isize,
    }
}

/// New absolute offset, `-1` on failure
pub fn lseek(rt: &Runtime, fd: c_int, offset: i64, whence: c_int) -> i64 {
    let span = CallSpan::new("lseek");
    span.record_handle(fd);
    let result = Whence::from_raw(whence).and_then(|w| rt.lseek(Handle(fd), offset, w));
    match span.finish(result) {
        Ok(pos) => pos as i64,
        Err(err) => fail(&err) as i64,
    }
}

pub fn fsync(rt: &Runtime, fd: c_int) -> c_int {
    let span = CallSpan::new("fsync");
    span.record_handle(fd);
    errno_ret(span, rt.fsync(Handle(fd)), |_| 0)
}

pub fn unlink(rt: &Runtime, path: &CStr) -> c_int {
    let span = CallSpan::new("unlink");
    errno_ret(span, rt.unlink(c_path(path)), |_| 0)
}

/// `mode` is accepted for signature compatibility; permissions are not modelled
pub fn mkdir(rt: &Runtime, path: &CStr, _mode: u32) -> c_int {
    let span = CallSpan::new("mkdir");
    errno_ret(span, rt.mkdir(c_path(path)), |_| 0)
}

pub fn rmdir(rt: &Runtime, path: &CStr) -> c_int {
    let span = CallSpan::new("rmdir");
    errno_ret(span, rt.rmdir(c_path(path)), |_| 0)
}

/// Existence check only: every `mode` succeeds for an existing path
pub fn access(rt: &Runtime, path: &CStr, _mode: c_int) -> c_int {
    let span = CallSpan::new("access");
    errno_ret(span, rt.access(c_path(path)), |_| 0)
}

/*!
 * dirent calls
 */

use std::ffi::{c_int, CStr};

use super::{c_path, errno_ret};
use crate::core::errno::fail;
use crate::core::id::Handle;
use crate::monitoring::CallSpan;
use crate::runtime::Runtime;
use crate::vfs::Entry;

/// Directory stream handle, `-1` on failure
pub fn opendir(rt: &Runtime, path: &CStr) -> c_int {
    let span = CallSpan::new("opendir");
    errno_ret(span, rt.opendir(c_path(path)), |h| h.raw())
}

/// Next entry
///
/// `None` both at the end of the stream and on failure; as in C, callers
/// tell the two apart by clearing errno first.
pub fn readdir(rt: &Runtime, dir: c_int) -> Option<Entry> {
    let span = CallSpan::new("readdir");
    span.record_handle(dir);
    match span.finish(rt.readdir(Handle(dir))) {
        Ok(entry) => entry,
        Err(err) => {
            fail(&err);
            None
        }
    }
}

pub fn rewinddir(rt: &Runtime, dir: c_int) {
    let span = CallSpan::new("rewinddir");
    span.record_handle(dir);
    // rewinddir has no way to report failure
    let _ = span.finish(rt.rewinddir(Handle(dir)));
}

pub fn closedir(rt: &Runtime, dir: c_int) -> c_int {
    let span = CallSpan::new("closedir");
    span.record_handle(dir);
    errno_ret(span, rt.closedir(Handle(dir)), |_| 0)
}

/*!
 * semaphore.h calls
 */

use std::ffi::c_int;

use super::errno_ret;
use crate::core::id::Handle;
use crate::core::time::Timespec;
use crate::monitoring::CallSpan;
use crate::runtime::Runtime;

/// `sem_init`: stores the new handle in `sem`
///
/// Semaphores are always process-local, so `pshared` is accepted and ignored.
/// A negative `value` or one above SEM_VALUE_MAX fails with EINVAL.
pub fn sem_init(rt: &Runtime, sem: &mut c_int, _pshared: c_int, value: i64) -> c_int {
    let span = CallSpan::new("sem_init");
    errno_ret(span, rt.sem_init(value), |h| {
        *sem = h.raw();
        0
    })
}

pub fn sem_post(rt: &Runtime, sem: c_int) -> c_int {
    let span = CallSpan::new("sem_post");
    span.record_handle(sem);
    errno_ret(span, rt.sem_post(Handle(sem)), |_| 0)
}

pub fn sem_wait(rt: &Runtime, sem: c_int) -> c_int {
    let span = CallSpan::blocking("sem_wait");
    span.record_handle(sem);
    errno_ret(span, rt.sem_wait(Handle(sem)), |_| 0)
}

/// EAGAIN when the count is zero
pub fn sem_trywait(rt: &Runtime, sem: c_int) -> c_int {
    let span = CallSpan::new("sem_trywait");
    span.record_handle(sem);
    errno_ret(span, rt.sem_try_wait(Handle(sem)), |_| 0)
}

/// ETIMEDOUT once `abstime` (CLOCK_REALTIME) passes
pub fn sem_timedwait(rt: &Runtime, sem: c_int, abstime: &Timespec) -> c_int {
    let span = CallSpan::blocking("sem_timedwait");
    span.record_handle(sem);
    errno_ret(span, rt.sem_timed_wait(Handle(sem), abstime), |_| 0)
}

/// Advisory snapshot of the count, written to `value`
pub fn sem_getvalue(rt: &Runtime, sem: c_int, value: &mut c_int) -> c_int {
    let span = CallSpan::new("sem_getvalue");
    span.record_handle(sem);
    errno_ret(span, rt.sem_get_value(Handle(sem)), |v| {
        *value = v as c_int;
        0
    })
}

/// EBUSY while threads are blocked on the semaphore
pub fn sem_destroy(rt: &Runtime, sem: c_int) -> c_int {
    let span = CallSpan::new("sem_destroy");
    span.record_handle(sem);
    errno_ret(span, rt.sem_destroy(Handle(sem)), |_| 0)
}

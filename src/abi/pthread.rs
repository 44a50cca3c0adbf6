/*!
 * pthread calls
 *
 * Every call returns `0` or an error code; errno is left untouched.
 */

use std::ffi::c_int;

use super::code_ret;
use crate::core::id::Handle;
use crate::core::time::Timespec;
use crate::monitoring::CallSpan;
use crate::runtime::Runtime;
use crate::sync::{MutexAttr, OnceGuard};

pub use crate::sync::{PTHREAD_MUTEX_DEFAULT, PTHREAD_MUTEX_NORMAL, PTHREAD_MUTEX_RECURSIVE};

/// Opaque thread identifier as handed to C callers
pub type PthreadT = c_int;

// =============================================================================
// MUTEX ATTRIBUTES
// =============================================================================

pub fn pthread_mutexattr_init(attr: &mut MutexAttr) -> c_int {
    *attr = MutexAttr::new();
    0
}

/// EINVAL for anything but the `PTHREAD_MUTEX_*` constants
pub fn pthread_mutexattr_settype(attr: &mut MutexAttr, typ: c_int) -> c_int {
    code_ret(CallSpan::new("pthread_mutexattr_settype"), attr.set_type(typ))
}

pub fn pthread_mutexattr_destroy(attr: &mut MutexAttr) -> c_int {
    *attr = MutexAttr::new();
    0
}

// =============================================================================
// MUTEX
// =============================================================================

/// Create a mutex; `attr` of `None` selects the default (non-recursive) type
pub fn pthread_mutex_init(rt: &Runtime, mutex: &mut c_int, attr: Option<&MutexAttr>) -> c_int {
    let attr = attr.copied().unwrap_or_default();
    *mutex = rt.mutex_init(&attr).raw();
    0
}

pub fn pthread_mutex_lock(rt: &Runtime, mutex: c_int) -> c_int {
    let span = CallSpan::blocking("pthread_mutex_lock");
    span.record_handle(mutex);
    code_ret(span, rt.mutex_lock(Handle(mutex)))
}

/// EBUSY when held by anyone, including a non-recursive owner
pub fn pthread_mutex_trylock(rt: &Runtime, mutex: c_int) -> c_int {
    let span = CallSpan::new("pthread_mutex_trylock");
    span.record_handle(mutex);
    code_ret(span, rt.mutex_try_lock(Handle(mutex)))
}

pub fn pthread_mutex_timedlock(rt: &Runtime, mutex: c_int, abstime: &Timespec) -> c_int {
    let span = CallSpan::blocking("pthread_mutex_timedlock");
    span.record_handle(mutex);
    code_ret(span, rt.mutex_timed_lock(Handle(mutex), abstime))
}

/// EINVAL when the caller does not own the mutex
pub fn pthread_mutex_unlock(rt: &Runtime, mutex: c_int) -> c_int {
    let span = CallSpan::new("pthread_mutex_unlock");
    span.record_handle(mutex);
    code_ret(span, rt.mutex_unlock(Handle(mutex)))
}

pub fn pthread_mutex_destroy(rt: &Runtime, mutex: c_int) -> c_int {
    let span = CallSpan::new("pthread_mutex_destroy");
    span.record_handle(mutex);
    code_ret(span, rt.mutex_destroy(Handle(mutex)))
}

// =============================================================================
// CONDITION VARIABLE
// =============================================================================

pub fn pthread_cond_init(rt: &Runtime, cond: &mut c_int) -> c_int {
    *cond = rt.cond_init().raw();
    0
}

pub fn pthread_cond_wait(rt: &Runtime, cond: c_int, mutex: c_int) -> c_int {
    let span = CallSpan::blocking("pthread_cond_wait");
    span.record_handle(cond);
    code_ret(span, rt.cond_wait(Handle(cond), Handle(mutex)))
}

pub fn pthread_cond_timedwait(rt: &Runtime, cond: c_int, mutex: c_int, abstime: &Timespec) -> c_int {
    let span = CallSpan::blocking("pthread_cond_timedwait");
    span.record_handle(cond);
    code_ret(span, rt.cond_timed_wait(Handle(cond), Handle(mutex), abstime))
}

pub fn pthread_cond_signal(rt: &Runtime, cond: c_int) -> c_int {
    let span = CallSpan::new("pthread_cond_signal");
    span.record_handle(cond);
    code_ret(span, rt.cond_signal(Handle(cond)).map(|_| ()))
}

pub fn pthread_cond_broadcast(rt: &Runtime, cond: c_int) -> c_int {
    let span = CallSpan::new("pthread_cond_broadcast");
    span.record_handle(cond);
    code_ret(span, rt.cond_broadcast(Handle(cond)).map(|_| ()))
}

pub fn pthread_cond_destroy(rt: &Runtime, cond: c_int) -> c_int {
    let span = CallSpan::new("pthread_cond_destroy");
    span.record_handle(cond);
    code_ret(span, rt.cond_destroy(Handle(cond)))
}

// =============================================================================
// ONCE
// =============================================================================

/// `pthread_once` over a `static` guard
pub fn pthread_once(control: &OnceGuard, init_routine: fn()) -> c_int {
    control.call(init_routine);
    0
}

// =============================================================================
// THREADS
// =============================================================================

/// Start `routine` with `arg`; the new thread id is stored in `thread`
pub fn pthread_create(
    rt: &Runtime,
    thread: &mut PthreadT,
    routine: fn(usize) -> usize,
    arg: usize,
) -> c_int {
    let span = CallSpan::new("pthread_create");
    let result = rt.thread_create(move || routine(arg)).map(|h| {
        *thread = h.raw();
    });
    code_ret(span, result)
}

/// Wait for `thread`; its return value is stored in `retval` when given
pub fn pthread_join(rt: &Runtime, thread: PthreadT, retval: Option<&mut usize>) -> c_int {
    let span = CallSpan::blocking("pthread_join");
    span.record_handle(thread);
    let result = rt.thread_join(Handle(thread)).map(|value| {
        if let Some(out) = retval {
            *out = value;
        }
    });
    code_ret(span, result)
}

/// `pthread_timedjoin_np`: ETIMEDOUT leaves the thread joinable
pub fn pthread_timedjoin_np(
    rt: &Runtime,
    thread: PthreadT,
    retval: Option<&mut usize>,
    abstime: &Timespec,
) -> c_int {
    let span = CallSpan::blocking("pthread_timedjoin_np");
    span.record_handle(thread);
    let result = rt.thread_timed_join(Handle(thread), abstime).map(|value| {
        if let Some(out) = retval {
            *out = value;
        }
    });
    code_ret(span, result)
}

pub fn pthread_detach(rt: &Runtime, thread: PthreadT) -> c_int {
    let span = CallSpan::new("pthread_detach");
    span.record_handle(thread);
    code_ret(span, rt.thread_detach(Handle(thread)))
}

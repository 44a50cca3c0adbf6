/*!
 * Once Guard
 * One-time initialization shared by all concurrent callers
 */

use parking_lot::Once;

/// `pthread_once_t`
///
/// Usable as a `static` per call site:
///
/// ```
/// use posix_compat::sync::OnceGuard;
///
/// static INIT: OnceGuard = OnceGuard::new();
/// INIT.call(|| println!("initialized"));
/// ```
///
/// The first caller runs the action while every other caller blocks; all of
/// them return only after it has finished. An action that never returns
/// blocks every past and future caller forever. If the action panics, the
/// guard reverts to not-completed and the next caller runs it again.
#[derive(Debug)]
pub struct OnceGuard {
    inner: Once,
}

impl OnceGuard {
    pub const fn new() -> Self {
        Self { inner: Once::new() }
    }

    pub fn call<F: FnOnce()>(&self, action: F) {
        self.inner.call_once_force(|_| action());
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.inner.state().done()
    }
}

impl Default for OnceGuard {
    fn default() -> Self {
        Self::new()
    }
}

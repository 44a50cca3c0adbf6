/*!
 * Call Tracing
 * Subscriber setup and per-call spans for the POSIX-shaped surface
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::errors::PosixError;

/// Calls slower than this are reported at `warn`, except blocking ones
const SLOW_CALL: Duration = Duration::from_millis(10);

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Install the global subscriber
///
/// Environment variables:
/// - RUST_LOG: log filter (default: info)
///
/// `json` selects line-delimited JSON output. Calling this twice is harmless:
/// the second installation attempt is ignored.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json, "tracing initialized");
    }
}

/// Span covering one POSIX-shaped call
///
/// Records the outcome and duration when dropped. Blocking calls (lock,
/// wait, join) are expected to take long and never count as slow.
pub struct CallSpan {
    span: tracing::Span,
    start: Instant,
    call: &'static str,
    call_id: u64,
    blocking: bool,
}

impl CallSpan {
    pub fn new(call: &'static str) -> Self {
        Self::with_blocking(call, false)
    }

    pub fn blocking(call: &'static str) -> Self {
        Self::with_blocking(call, true)
    }

    fn with_blocking(call: &'static str, blocking: bool) -> Self {
        let call_id = NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed);
        let span = span!(
            Level::DEBUG,
            "posix_call",
            call_id,
            call,
            handle = tracing::field::Empty,
            result = tracing::field::Empty,
            errno = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            call,
            call_id,
            blocking,
        }
    }

    #[inline]
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    pub fn record_handle(&self, handle: i32) {
        self.span.record("handle", handle);
    }

    /// Record the outcome of the call and pass it through
    pub fn finish<T>(&self, result: Result<T, PosixError>) -> Result<T, PosixError> {
        match &result {
            Ok(_) => {
                self.span.record("result", "ok");
            }
            Err(err) => {
                self.span.record("result", "error");
                self.span.record("errno", err.errno());
                let _entered = self.span.enter();
                debug!(call = self.call, error = %err, "call failed");
            }
        }
        result
    }
}

impl Drop for CallSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();

        if !self.blocking && elapsed > SLOW_CALL {
            warn!(
                call = self.call,
                call_id = self.call_id,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "slow call detected"
            );
        } else {
            debug!(
                call = self.call,
                call_id = self.call_id,
                duration_us = elapsed.as_micros() as u64,
                "call completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_ids_increase() {
        let a = CallSpan::new("close");
        let b = CallSpan::blocking("pthread_mutex_lock");
        assert!(b.call_id() > a.call_id());
    }

    #[test]
    fn test_finish_passes_result_through() {
        let span = CallSpan::new("sem_trywait");
        assert_eq!(span.finish::<()>(Err(PosixError::WouldBlock)), Err(PosixError::WouldBlock));
        assert_eq!(span.finish(Ok(3)), Ok(3));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(false);
        init_tracing(true);
    }
}

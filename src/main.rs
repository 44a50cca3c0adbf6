/*!
 * posix-compat - Self-Check Entry Point
 *
 * Builds a runtime from the environment, prints the effective configuration
 * and drives each primitive family once through the C-shaped surface.
 */

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use posix_compat::abi::{self, pthread, semaphore, unistd};
use posix_compat::{init_tracing, va_args, ArgList, Runtime, RuntimeConfig, Timespec};

fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();
    init_tracing(config.trace_json);

    info!("posix-compat self-check starting...");
    let dump = serde_json::to_string_pretty(&config).context("serializing configuration")?;
    println!("{}", dump);

    let rt = Arc::new(Runtime::builder().with_config(config).build());

    check_streams(&rt)?;
    check_sync(&rt)?;
    check_varargs()?;

    let released = rt.shutdown();
    info!(released, "self-check complete");
    Ok(())
}

/// Fail with the errno text unless a `-1 + errno` style call returned 0
fn ensure_ok(rc: impl Into<i64>, call: &str) -> Result<()> {
    if rc.into() != 0 {
        bail!("{} failed: {}", call, abi::strerror(abi::errno()));
    }
    Ok(())
}

/// pthread-style calls return the error code instead of setting errno
fn ensure_code(code: i32, call: &str) -> Result<()> {
    if code != 0 {
        bail!("{} failed: {}", call, abi::strerror(code));
    }
    Ok(())
}

fn check_streams(rt: &Runtime) -> Result<()> {
    let fd = unistd::fopen(rt, c"self-check.txt", c"w+");
    if fd < 0 {
        bail!("fopen failed: {}", abi::strerror(abi::errno()));
    }

    let msg = b"posix-compat";
    if unistd::write(rt, fd, msg) != msg.len() as isize {
        bail!("short write: {}", abi::strerror(abi::errno()));
    }
    ensure_ok(unistd::lseek(rt, fd, 0, unistd::SEEK_SET), "lseek")?;

    let mut buf = [0u8; 32];
    let n = unistd::read(rt, fd, &mut buf);
    if n < 0 || &buf[..n as usize] != msg {
        bail!("read back mismatch");
    }
    ensure_ok(unistd::close(rt, fd), "close")?;
    ensure_ok(unistd::unlink(rt, c"self-check.txt"), "unlink")?;

    info!(fd, bytes = n, "streams ok");
    Ok(())
}

fn check_sync(rt: &Arc<Runtime>) -> Result<()> {
    let mut mutex = -1;
    ensure_code(pthread::pthread_mutex_init(rt, &mut mutex, None), "pthread_mutex_init")?;
    let mut sem = -1;
    ensure_ok(semaphore::sem_init(rt, &mut sem, 0, 0), "sem_init")?;

    let worker_rt = Arc::clone(rt);
    let worker = rt
        .thread_create(move || {
            // Non-zero status reports the first failing step
            if pthread::pthread_mutex_lock(&worker_rt, mutex) != 0 {
                return 1;
            }
            if pthread::pthread_mutex_unlock(&worker_rt, mutex) != 0 {
                return 2;
            }
            if semaphore::sem_post(&worker_rt, sem) != 0 {
                return 3;
            }
            0
        })
        .context("starting worker thread")?;

    let deadline = Timespec::from_now(Duration::from_secs(5));
    ensure_ok(semaphore::sem_timedwait(rt, sem, &deadline), "sem_timedwait")?;
    let status = rt.thread_join(worker).context("joining worker thread")?;
    if status != 0 {
        bail!("worker failed at step {}", status);
    }

    ensure_ok(semaphore::sem_destroy(rt, sem), "sem_destroy")?;
    ensure_code(pthread::pthread_mutex_destroy(rt, mutex), "pthread_mutex_destroy")?;

    info!(status, "synchronization ok");
    Ok(())
}

fn check_varargs() -> Result<()> {
    let mut va = ArgList::new();
    va.start(1, va_args![3i32, 0.5f32, 42u64])?;
    let total = va.arg::<i32>()? as f64 + va.arg::<f64>()? + va.arg::<u64>()? as f64;
    va.end()?;

    info!(total, "varargs ok");
    Ok(())
}

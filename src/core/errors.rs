/*!
 * Error Types
 * POSIX-shaped result taxonomy with thiserror, miette, and serde support
 *
 * Every host-level failure is translated into one of these kinds before it
 * crosses back to a caller. Host error types never leak through.
 */

use super::id::Handle;
use crate::vfs::VfsError;
use miette::Diagnostic;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for every operation of the compatibility layer
pub type PosixResult<T> = Result<T, PosixError>;

/// What a `NotFound` failure was looking for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Handle(Handle),
    Path(PathBuf),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Handle(h) => write!(f, "handle {}", h),
            Target::Path(p) => write!(f, "path {}", p.display()),
        }
    }
}

/// Fixed failure taxonomy of the compatibility layer
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PosixError {
    #[error("Not found: {0}")]
    #[diagnostic(
        code(posix::not_found),
        help("The handle or path does not name a live resource.")
    )]
    NotFound(Target),

    #[error("Handle {0} was already closed")]
    #[diagnostic(
        code(posix::already_closed),
        help("The handle was released earlier. Handles must not be used after close/destroy.")
    )]
    AlreadyClosed(Handle),

    #[error("Operation would block")]
    #[diagnostic(code(posix::would_block), help("Retry later or use the blocking variant."))]
    WouldBlock,

    #[error("Deadline elapsed before the operation completed")]
    #[diagnostic(code(posix::timed_out))]
    TimedOut,

    #[error("Resource busy")]
    #[diagnostic(
        code(posix::busy),
        help("The resource is held or has waiters. Retry once it is released.")
    )]
    Busy,

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(posix::invalid_argument))]
    InvalidArgument(String),
}

impl PosixError {
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    #[inline]
    pub fn missing_handle(handle: Handle) -> Self {
        Self::NotFound(Target::Handle(handle))
    }

    #[inline]
    pub fn missing_path(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(Target::Path(path.into()))
    }

    /// errno value for this failure (Linux numbering)
    pub fn errno(&self) -> i32 {
        let code = match self {
            PosixError::NotFound(Target::Handle(_)) => Errno::EBADF,
            PosixError::NotFound(Target::Path(_)) => Errno::ENOENT,
            PosixError::AlreadyClosed(_) => Errno::EBADF,
            PosixError::WouldBlock => Errno::EAGAIN,
            PosixError::TimedOut => Errno::ETIMEDOUT,
            PosixError::Busy => Errno::EBUSY,
            PosixError::InvalidArgument(_) => Errno::EINVAL,
        };
        code as i32
    }

    /// Translate a host I/O failure, attaching the path it concerned when known
    pub fn from_io(err: std::io::Error, path: Option<&std::path::Path>) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound => match path {
                Some(p) => PosixError::missing_path(p),
                None => PosixError::invalid(err.to_string()),
            },
            ErrorKind::WouldBlock => PosixError::WouldBlock,
            ErrorKind::TimedOut => PosixError::TimedOut,
            _ => PosixError::invalid(err.to_string()),
        }
    }
}

impl From<std::io::Error> for PosixError {
    fn from(err: std::io::Error) -> Self {
        PosixError::from_io(err, None)
    }
}

impl From<VfsError> for PosixError {
    fn from(err: VfsError) -> Self {
        match err {
            VfsError::NotFound(path) => PosixError::missing_path(path),
            other => PosixError::invalid(other.to_string()),
        }
    }
}

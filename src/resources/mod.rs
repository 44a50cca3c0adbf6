/*!
 * Resource Objects
 *
 * Everything a handle can name, as one tagged variant. Each variant carries
 * only the state its own operations need; the handle table stores them and
 * the runtime dispatches on the variant after a lookup.
 */

mod directory;
mod stream;

pub use directory::DirStream;
pub use stream::Stream;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::{PosixError, PosixResult};
use crate::core::id::HandleCategory;
use crate::sync::{JoinTarget, OnceGuard, PosixCondvar, PosixMutex, Semaphore};

/// Live object behind a handle
#[derive(Debug)]
pub enum Resource {
    Stream(Stream),
    Directory(DirStream),
    Mutex(PosixMutex),
    CondVar(PosixCondvar),
    Semaphore(Semaphore),
    Once(OnceGuard),
    JoinTarget(JoinTarget),
}

/// Discriminant of `Resource`, for logging and mismatch reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Stream,
    Directory,
    Mutex,
    CondVar,
    Semaphore,
    Once,
    JoinTarget,
}

impl ResourceKind {
    /// Handle namespace this kind is allocated in
    pub const fn category(self) -> HandleCategory {
        match self {
            ResourceKind::Stream | ResourceKind::Directory => HandleCategory::File,
            _ => HandleCategory::Sync,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Stream => "stream",
            ResourceKind::Directory => "directory",
            ResourceKind::Mutex => "mutex",
            ResourceKind::CondVar => "condvar",
            ResourceKind::Semaphore => "semaphore",
            ResourceKind::Once => "once",
            ResourceKind::JoinTarget => "thread",
        };
        f.write_str(name)
    }
}

macro_rules! accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Borrow as `", stringify!($ty), "`, or `InvalidArgument` for any other kind")]
        pub fn $name(&self) -> PosixResult<&$ty> {
            match self {
                Resource::$variant(inner) => Ok(inner),
                other => Err(other.mismatch(ResourceKind::$variant)),
            }
        }
    };
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Stream(_) => ResourceKind::Stream,
            Resource::Directory(_) => ResourceKind::Directory,
            Resource::Mutex(_) => ResourceKind::Mutex,
            Resource::CondVar(_) => ResourceKind::CondVar,
            Resource::Semaphore(_) => ResourceKind::Semaphore,
            Resource::Once(_) => ResourceKind::Once,
            Resource::JoinTarget(_) => ResourceKind::JoinTarget,
        }
    }

    accessor!(as_stream, Stream, Stream);
    accessor!(as_directory, Directory, DirStream);
    accessor!(as_mutex, Mutex, PosixMutex);
    accessor!(as_condvar, CondVar, PosixCondvar);
    accessor!(as_semaphore, Semaphore, Semaphore);
    accessor!(as_once, Once, OnceGuard);
    accessor!(as_join_target, JoinTarget, JoinTarget);

    /// Whether destroying this resource now would strand another context
    ///
    /// A held mutex or a condvar/semaphore with queued waiters is busy.
    pub fn is_busy(&self) -> bool {
        match self {
            Resource::Mutex(m) => m.is_locked(),
            Resource::CondVar(cv) => cv.waiter_count() > 0,
            Resource::Semaphore(sem) => sem.waiter_count() > 0,
            _ => false,
        }
    }

    fn mismatch(&self, expected: ResourceKind) -> PosixError {
        PosixError::invalid(format!(
            "handle names a {}, expected a {}",
            self.kind(),
            expected
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MutexAttr;

    #[test]
    fn test_kind_and_category() {
        let res = Resource::Semaphore(Semaphore::new(1).unwrap());
        assert_eq!(res.kind(), ResourceKind::Semaphore);
        assert_eq!(res.kind().category(), HandleCategory::Sync);
        assert_eq!(ResourceKind::Directory.category(), HandleCategory::File);
    }

    #[test]
    fn test_accessor_mismatch() {
        let res = Resource::Mutex(PosixMutex::new(&MutexAttr::new()));
        assert!(res.as_mutex().is_ok());
        match res.as_condvar() {
            Err(PosixError::InvalidArgument(msg)) => {
                assert!(msg.contains("mutex"));
                assert!(msg.contains("condvar"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_busy_states() {
        let res = Resource::Mutex(PosixMutex::new(&MutexAttr::new()));
        assert!(!res.is_busy());
        res.as_mutex().unwrap().lock().unwrap();
        assert!(res.is_busy());
        res.as_mutex().unwrap().unlock().unwrap();
        assert!(!res.is_busy());
    }
}

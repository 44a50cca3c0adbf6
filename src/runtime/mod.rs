/*!
 * Runtime Service
 *
 * Explicit owner of both handle tables and the host filesystem. Every
 * POSIX-shaped call resolves its handle here, dispatches to the resource
 * variant it expects and returns a `PosixResult`.
 *
 * A `Runtime` is built once (see `RuntimeBuilder`), shared by reference or
 * `Arc` across threads, and torn down with `shutdown`.
 */

mod builder;
mod files;
mod sync;

pub use builder::RuntimeBuilder;
pub use files::{Whence, SEEK_CUR, SEEK_END, SEEK_SET};

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::core::errors::PosixResult;
use crate::core::id::{Handle, HandleCategory};
use crate::handles::HandleTable;
use crate::resources::Resource;
use crate::vfs::FileSystem;

/// Handle tables plus the filesystem they open files from
pub struct Runtime {
    files: HandleTable<Resource>,
    sync: HandleTable<Resource>,
    fs: Arc<dyn FileSystem>,
    config: RuntimeConfig,
    thread_seq: AtomicU64,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[inline]
    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Live handles in a category (diagnostic)
    pub fn live_handles(&self, category: HandleCategory) -> usize {
        match category {
            HandleCategory::File => self.files.len(),
            HandleCategory::Sync => self.sync.len(),
        }
    }

    /// Release every live handle, flushing open streams
    ///
    /// Blocked waiters are not woken; shut down only once the threads using
    /// this runtime are done with it. Returns the number of handles released.
    pub fn shutdown(&self) -> usize {
        let mut released = 0;

        for (handle, resource) in self.files.drain() {
            if let Resource::Stream(stream) = resource.as_ref() {
                if let Err(e) = stream.close() {
                    warn!(handle = %handle, error = %e, "flush failed during shutdown");
                }
            }
            released += 1;
        }

        for (handle, resource) in self.sync.drain() {
            if resource.is_busy() {
                warn!(handle = %handle, kind = %resource.kind(), "released busy resource during shutdown");
            }
            if let Resource::JoinTarget(target) = resource.as_ref() {
                target.detach();
            }
            released += 1;
        }

        info!(released, "runtime shut down");
        released
    }

    fn table(&self, category: HandleCategory) -> &HandleTable<Resource> {
        match category {
            HandleCategory::File => &self.files,
            HandleCategory::Sync => &self.sync,
        }
    }

    /// Store a resource in the table its kind belongs to
    fn register(&self, resource: Resource) -> Handle {
        let kind = resource.kind();
        let handle = self.table(kind.category()).allocate(resource);
        debug!(handle = %handle, kind = %kind, "resource registered");
        handle
    }

    fn resolve(&self, category: HandleCategory, handle: Handle) -> PosixResult<Arc<Resource>> {
        self.table(category).lookup(handle)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("filesystem", &self.fs.name())
            .field("files", &self.files.len())
            .field("sync", &self.sync.len())
            .field("config", &self.config)
            .finish()
    }
}

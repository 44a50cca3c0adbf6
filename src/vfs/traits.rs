/*!
 * VFS Traits
 * Host filesystem capabilities consumed by stream and directory resources
 */

use std::io::{Read, Seek, Write};
use std::path::Path;

use super::types::*;

/// Host filesystem
///
/// The compatibility layer only needs "a capability-shaped object exists
/// behind this path"; everything else about storage belongs to the host.
/// Paths are absolute within the backend's own namespace.
pub trait FileSystem: Send + Sync {
    /// Backs `open`/`fopen`
    fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<Box<dyn OpenFile>>;

    /// Snapshot of a directory's entries, sorted by name
    fn read_dir(&self, path: &Path) -> VfsResult<Vec<Entry>>;

    fn metadata(&self, path: &Path) -> VfsResult<Metadata>;

    /// Backs `unlink`; directories are refused
    fn remove_file(&self, path: &Path) -> VfsResult<()>;

    /// Backs `mkdir`; the parent must already exist
    fn create_dir(&self, path: &Path) -> VfsResult<()>;

    /// Backs `rmdir`; fails with `NotEmpty` unless the directory is empty
    fn remove_dir(&self, path: &Path) -> VfsResult<()>;

    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }

    /// Backend label for logs
    fn name(&self) -> &str;
}

/// Byte stream behind a file handle
///
/// Dropping it closes the underlying host object.
pub trait OpenFile: Read + Write + Seek + Send + Sync {
    /// Backs `fsync`
    fn sync(&mut self) -> VfsResult<()>;
}

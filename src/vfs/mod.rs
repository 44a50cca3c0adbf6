/*!
 * Virtual File System Module
 * Host filesystem collaborator behind stream and directory handles
 */

pub mod local;
pub mod memory;
pub mod stdio;
pub mod traits;
pub mod types;

// Re-exports
pub use local::LocalFS;
pub use memory::MemFS;
pub use stdio::StdStream;
pub use traits::{FileSystem, OpenFile};
pub use types::{Entry, FileType, Metadata, OpenFlags, VfsError, VfsResult};

use std::path::{Path, PathBuf};

/// Absolute, lexically cleaned form of `path`; `..` stops at `/`
pub(crate) fn normalize(path: &Path) -> PathBuf {
    PathBuf::from(path_clean::clean(Path::new("/").join(path)))
}

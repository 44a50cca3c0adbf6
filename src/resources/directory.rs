/*!
 * Directory Streams
 * `opendir` snapshots walked by `readdir`
 */

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::vfs::Entry;

/// Open directory stream
///
/// Entries are captured when the stream is opened; later changes to the
/// directory are not reflected until the caller reopens it.
#[derive(Debug)]
pub struct DirStream {
    path: PathBuf,
    entries: Vec<Entry>,
    pos: Mutex<usize>,
}

impl DirStream {
    pub fn new(path: impl Into<PathBuf>, entries: Vec<Entry>) -> Self {
        Self {
            path: path.into(),
            entries,
            pos: Mutex::new(0),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next entry, `None` at the end of the stream
    pub fn read(&self) -> Option<Entry> {
        let mut pos = self.pos.lock();
        let entry = self.entries.get(*pos).cloned()?;
        *pos += 1;
        Some(entry)
    }

    pub fn rewind(&self) {
        *self.pos.lock() = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/*!
 * Byte Streams
 * Open files and standard streams behind file-category handles
 */

use parking_lot::Mutex;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::core::errors::{PosixError, PosixResult};
use crate::vfs::{OpenFile, OpenFlags};

/// Open byte stream
///
/// The cursor lives in the host file object and is guarded by the stream's
/// own lock, so two callers sharing a handle see a consistent position.
pub struct Stream {
    path: PathBuf,
    flags: OpenFlags,
    file: Mutex<Box<dyn OpenFile>>,
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("path", &self.path)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Stream {
    pub fn new(path: impl Into<PathBuf>, flags: OpenFlags, file: Box<dyn OpenFile>) -> Self {
        Self {
            path: path.into(),
            flags,
            file: Mutex::new(file),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn read(&self, buf: &mut [u8]) -> PosixResult<usize> {
        if !self.flags.read {
            return Err(PosixError::invalid(format!(
                "{} is not open for reading",
                self.path.display()
            )));
        }
        self.file.lock().read(buf).map_err(|e| self.io_error(e))
    }

    pub fn write(&self, buf: &[u8]) -> PosixResult<usize> {
        if !self.flags.write {
            return Err(PosixError::invalid(format!(
                "{} is not open for writing",
                self.path.display()
            )));
        }
        self.file.lock().write(buf).map_err(|e| self.io_error(e))
    }

    /// Reposition the cursor, returning the new absolute offset
    pub fn seek(&self, pos: SeekFrom) -> PosixResult<u64> {
        self.file.lock().seek(pos).map_err(|e| self.io_error(e))
    }

    pub fn sync(&self) -> PosixResult<()> {
        self.file.lock().sync().map_err(PosixError::from)
    }

    /// Flush buffered data before the stream is dropped
    pub fn close(&self) -> PosixResult<()> {
        self.file.lock().flush().map_err(|e| self.io_error(e))
    }

    fn io_error(&self, err: std::io::Error) -> PosixError {
        PosixError::from_io(err, Some(&self.path))
    }
}

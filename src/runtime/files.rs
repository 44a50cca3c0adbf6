/*!
 * File Operations
 * Streams, directory streams and path calls dispatched through the file table
 */

use std::io::SeekFrom;
use std::path::Path;
use tracing::debug;

use super::Runtime;
use crate::core::errors::{PosixError, PosixResult};
use crate::core::id::{Handle, HandleCategory};
use crate::resources::{DirStream, Resource, Stream};
use crate::vfs::{Entry, FileType, OpenFlags};

pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

/// Reference point for `lseek`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    End,
}

impl Whence {
    /// Parse a `SEEK_*` constant
    pub fn from_raw(whence: i32) -> PosixResult<Self> {
        match whence {
            SEEK_SET => Ok(Whence::Set),
            SEEK_CUR => Ok(Whence::Cur),
            SEEK_END => Ok(Whence::End),
            other => Err(PosixError::invalid(format!("invalid whence {}", other))),
        }
    }

    fn seek_from(self, offset: i64) -> PosixResult<SeekFrom> {
        match self {
            Whence::Set if offset < 0 => Err(PosixError::invalid(format!(
                "negative absolute offset {}",
                offset
            ))),
            Whence::Set => Ok(SeekFrom::Start(offset as u64)),
            Whence::Cur => Ok(SeekFrom::Current(offset)),
            Whence::End => Ok(SeekFrom::End(offset)),
        }
    }
}

impl Runtime {
    // =========================================================================
    // STREAMS
    // =========================================================================

    /// Open `path` and return a fresh file handle
    pub fn open(&self, path: impl AsRef<Path>, flags: OpenFlags) -> PosixResult<Handle> {
        let path = path.as_ref();
        if !flags.read && !flags.write {
            return Err(PosixError::invalid("open without read or write access"));
        }

        let file = self.fs.open(path, flags).map_err(|e| path_error(e, path))?;
        let handle = self.register(Resource::Stream(Stream::new(path, flags, file)));
        debug!(handle = %handle, path = %path.display(), ?flags, "stream opened");
        Ok(handle)
    }

    /// Open with an `fopen`-style mode string (`"r"`, `"w+"`, `"ab"`, ...)
    pub fn open_mode(&self, path: impl AsRef<Path>, mode: &str) -> PosixResult<Handle> {
        let flags = OpenFlags::from_mode(mode)
            .ok_or_else(|| PosixError::invalid(format!("invalid open mode {:?}", mode)))?;
        self.open(path, flags)
    }

    /// Release a file handle; an open stream is flushed first
    pub fn close(&self, handle: Handle) -> PosixResult<()> {
        let resource = self.files.release(handle)?;
        debug!(handle = %handle, kind = %resource.kind(), "file handle closed");

        match resource.as_ref() {
            Resource::Stream(stream) => stream.close(),
            _ => Ok(()),
        }
    }

    pub fn read(&self, handle: Handle, buf: &mut [u8]) -> PosixResult<usize> {
        let resource = self.resolve(HandleCategory::File, handle)?;
        resource.as_stream()?.read(buf)
    }

    pub fn write(&self, handle: Handle, buf: &[u8]) -> PosixResult<usize> {
        let resource = self.resolve(HandleCategory::File, handle)?;
        resource.as_stream()?.write(buf)
    }

    /// Move the stream cursor, returning the new absolute offset
    pub fn lseek(&self, handle: Handle, offset: i64, whence: Whence) -> PosixResult<u64> {
        let resource = self.resolve(HandleCategory::File, handle)?;
        resource.as_stream()?.seek(whence.seek_from(offset)?)
    }

    pub fn fsync(&self, handle: Handle) -> PosixResult<()> {
        let resource = self.resolve(HandleCategory::File, handle)?;
        resource.as_stream()?.sync()
    }

    // =========================================================================
    // DIRECTORY STREAMS
    // =========================================================================

    pub fn opendir(&self, path: impl AsRef<Path>) -> PosixResult<Handle> {
        let path = path.as_ref();
        let entries = self.fs.read_dir(path).map_err(|e| path_error(e, path))?;
        let count = entries.len();

        let handle = self.register(Resource::Directory(DirStream::new(path, entries)));
        debug!(handle = %handle, path = %path.display(), entries = count, "directory opened");
        Ok(handle)
    }

    /// Next entry, `Ok(None)` once the stream is exhausted
    pub fn readdir(&self, handle: Handle) -> PosixResult<Option<Entry>> {
        let resource = self.resolve(HandleCategory::File, handle)?;
        Ok(resource.as_directory()?.read())
    }

    pub fn rewinddir(&self, handle: Handle) -> PosixResult<()> {
        let resource = self.resolve(HandleCategory::File, handle)?;
        resource.as_directory()?.rewind();
        Ok(())
    }

    pub fn closedir(&self, handle: Handle) -> PosixResult<()> {
        let resolved = self.resolve(HandleCategory::File, handle)?;
        resolved.as_directory()?;
        self.files.release_if(handle, &resolved)?;
        debug!(handle = %handle, "directory closed");
        Ok(())
    }

    // =========================================================================
    // PATH CALLS
    // =========================================================================

    pub fn unlink(&self, path: impl AsRef<Path>) -> PosixResult<()> {
        let path = path.as_ref();
        self.fs.remove_file(path).map_err(|e| path_error(e, path))
    }

    pub fn mkdir(&self, path: impl AsRef<Path>) -> PosixResult<()> {
        let path = path.as_ref();
        self.fs.create_dir(path).map_err(|e| path_error(e, path))
    }

    pub fn rmdir(&self, path: impl AsRef<Path>) -> PosixResult<()> {
        let path = path.as_ref();
        self.fs.remove_dir(path).map_err(|e| path_error(e, path))
    }

    /// Existence check; `NotFound` when nothing lives at `path`
    pub fn access(&self, path: impl AsRef<Path>) -> PosixResult<FileType> {
        let path = path.as_ref();
        self.fs
            .metadata(path)
            .map(|meta| meta.file_type)
            .map_err(|e| path_error(e, path))
    }
}

/// Attach the requested path to a host failure
fn path_error(err: crate::vfs::VfsError, path: &Path) -> PosixError {
    match err {
        crate::vfs::VfsError::NotFound(_) => PosixError::missing_path(path),
        other => PosixError::from(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::Target;
    use pretty_assertions::assert_eq;

    fn runtime() -> Runtime {
        Runtime::builder().build()
    }

    #[test]
    fn test_first_handle_after_stdio() {
        let rt = runtime();
        let fd = rt.open("/f", OpenFlags::create()).unwrap();
        assert_eq!(fd, Handle(3));
    }

    #[test]
    fn test_write_seek_read() {
        let rt = runtime();
        let fd = rt.open_mode("/notes.txt", "w+b").unwrap();

        assert_eq!(rt.write(fd, b"abcdef").unwrap(), 6);
        assert_eq!(rt.lseek(fd, -2, Whence::End).unwrap(), 4);

        let mut buf = [0u8; 8];
        assert_eq!(rt.read(fd, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");

        assert!(rt.lseek(fd, -1, Whence::Set).is_err());
        rt.close(fd).unwrap();
    }

    #[test]
    fn test_use_after_close() {
        let rt = runtime();
        let fd = rt.open("/f", OpenFlags::create()).unwrap();
        rt.close(fd).unwrap();

        assert_eq!(rt.close(fd), Err(PosixError::AlreadyClosed(fd)));
        assert_eq!(rt.write(fd, b"x"), Err(PosixError::AlreadyClosed(fd)));
        assert_eq!(
            rt.close(Handle(999)),
            Err(PosixError::NotFound(Target::Handle(Handle(999))))
        );
    }

    #[test]
    fn test_open_missing_reports_path() {
        let rt = runtime();
        let err = rt.open("/nope", OpenFlags::read_only()).unwrap_err();
        assert_eq!(err, PosixError::missing_path("/nope"));
        assert!(matches!(rt.open_mode("/x", "rw"), Err(PosixError::InvalidArgument(_))));
    }

    #[test]
    fn test_directory_stream() {
        let rt = runtime();
        rt.mkdir("/d").unwrap();
        rt.close(rt.open("/d/b", OpenFlags::create()).unwrap()).unwrap();
        rt.mkdir("/d/a").unwrap();

        let dir = rt.opendir("/d").unwrap();
        let first = rt.readdir(dir).unwrap().unwrap();
        assert_eq!(first.name, "a");
        assert!(first.is_dir());
        assert_eq!(rt.readdir(dir).unwrap().map(|e| e.name), Some("b".to_string()));
        assert_eq!(rt.readdir(dir).unwrap(), None);

        rt.rewinddir(dir).unwrap();
        assert!(rt.readdir(dir).unwrap().is_some());

        // Stream calls on a directory handle are a kind mismatch
        assert!(matches!(rt.read(dir, &mut [0u8; 1]), Err(PosixError::InvalidArgument(_))));
        rt.closedir(dir).unwrap();
        assert_eq!(rt.readdir(dir), Err(PosixError::AlreadyClosed(dir)));
    }

    #[test]
    fn test_path_calls() {
        let rt = runtime();
        rt.mkdir("/tmp").unwrap();
        rt.close(rt.open("/tmp/x", OpenFlags::create()).unwrap()).unwrap();

        assert_eq!(rt.access("/tmp/x").unwrap(), FileType::File);
        assert!(matches!(rt.rmdir("/tmp"), Err(PosixError::InvalidArgument(_))));

        rt.unlink("/tmp/x").unwrap();
        assert_eq!(rt.access("/tmp/x"), Err(PosixError::missing_path("/tmp/x")));
        rt.rmdir("/tmp").unwrap();
    }

    #[test]
    fn test_stdio_is_closeable_and_reused() {
        let rt = runtime();
        rt.close(Handle::STDIN).unwrap();
        assert_eq!(rt.read(Handle::STDIN, &mut [0u8; 1]), Err(PosixError::AlreadyClosed(Handle::STDIN)));

        let fd = rt.open("/f", OpenFlags::create()).unwrap();
        assert_eq!(fd, Handle::STDIN);
    }

    #[test]
    fn test_whence_parsing() {
        assert_eq!(Whence::from_raw(SEEK_CUR).unwrap(), Whence::Cur);
        assert!(Whence::from_raw(7).is_err());
    }
}

/*!
 * Standard Streams
 * Host stdin/stdout/stderr adapted to the OpenFile capability set
 */

use std::io::{Read, Seek, SeekFrom, Write};

use super::traits::OpenFile;
use super::types::{VfsError, VfsResult};

/// One of the three pre-opened process streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    /// Boxed host stream for installation in the reserved slots
    pub fn boxed(self) -> Box<dyn OpenFile> {
        Box::new(self)
    }

    fn unsupported(&self, op: &str) -> std::io::Error {
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("{} not supported on {:?}", op, self),
        )
    }
}

impl Read for StdStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            StdStream::Stdin => std::io::stdin().read(buf),
            _ => Err(self.unsupported("read")),
        }
    }
}

impl Write for StdStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            StdStream::Stdout => std::io::stdout().write(buf),
            StdStream::Stderr => std::io::stderr().write(buf),
            StdStream::Stdin => Err(self.unsupported("write")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            StdStream::Stdout => std::io::stdout().flush(),
            StdStream::Stderr => std::io::stderr().flush(),
            StdStream::Stdin => Ok(()),
        }
    }
}

impl Seek for StdStream {
    fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
        Err(self.unsupported("seek"))
    }
}

impl OpenFile for StdStream {
    fn sync(&mut self) -> VfsResult<()> {
        self.flush().map_err(|e| VfsError::IoError(e.to_string()))
    }
}

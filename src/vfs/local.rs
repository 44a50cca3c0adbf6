/*!
 * Local Filesystem Backend
 * Wraps std::fs for host filesystem access below a root directory
 */

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::normalize;
use super::traits::{FileSystem, OpenFile};
use super::types::*;

/// Host directory tree exposed as `/`
#[derive(Debug, Clone)]
pub struct LocalFS {
    root: PathBuf,
}

impl LocalFS {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Host path for `path`; `..` never climbs above the root
    fn resolve(&self, path: &Path) -> PathBuf {
        let clean = normalize(path);
        match clean.strip_prefix("/") {
            Ok(relative) => self.root.join(relative),
            Err(_) => self.root.clone(),
        }
    }

    fn io_error(err: std::io::Error, path: &Path) -> VfsError {
        let shown = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound(shown),
            std::io::ErrorKind::PermissionDenied => VfsError::PermissionDenied(shown),
            std::io::ErrorKind::AlreadyExists => VfsError::AlreadyExists(shown),
            _ => VfsError::IoError(format!("{}: {}", shown, err)),
        }
    }
}

impl FileSystem for LocalFS {
    fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<Box<dyn OpenFile>> {
        let full_path = self.resolve(path);
        if full_path.is_dir() {
            return Err(VfsError::IsADirectory(path.display().to_string()));
        }

        let file = fs::OpenOptions::new()
            .read(flags.read)
            .write(flags.write)
            .append(flags.append)
            .truncate(flags.truncate)
            .create(flags.create)
            .create_new(flags.create_new)
            .open(&full_path)
            .map_err(|e| Self::io_error(e, path))?;

        Ok(Box::new(LocalFile { file }))
    }

    fn read_dir(&self, path: &Path) -> VfsResult<Vec<Entry>> {
        let full_path = self.resolve(path);
        let reader = fs::read_dir(&full_path).map_err(|e| Self::io_error(e, path))?;

        let mut entries = Vec::new();
        for item in reader {
            let item = item.map_err(|e| Self::io_error(e, path))?;
            let file_type = match item.file_type() {
                Ok(t) if t.is_dir() => FileType::Directory,
                _ => FileType::File,
            };
            entries.push(Entry::new(
                item.file_name().to_string_lossy().into_owned(),
                file_type,
            ));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn metadata(&self, path: &Path) -> VfsResult<Metadata> {
        let meta = fs::metadata(self.resolve(path)).map_err(|e| Self::io_error(e, path))?;
        Ok(Metadata {
            file_type: if meta.is_dir() {
                FileType::Directory
            } else {
                FileType::File
            },
            size: meta.len(),
        })
    }

    fn remove_file(&self, path: &Path) -> VfsResult<()> {
        fs::remove_file(self.resolve(path)).map_err(|e| Self::io_error(e, path))
    }

    fn create_dir(&self, path: &Path) -> VfsResult<()> {
        fs::create_dir(self.resolve(path)).map_err(|e| Self::io_error(e, path))
    }

    fn remove_dir(&self, path: &Path) -> VfsResult<()> {
        fs::remove_dir(self.resolve(path)).map_err(|e| Self::io_error(e, path))
    }

    fn name(&self) -> &str {
        "local"
    }
}

struct LocalFile {
    file: fs::File,
}

impl Read for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for LocalFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl Seek for LocalFile {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

impl OpenFile for LocalFile {
    fn sync(&mut self) -> VfsResult<()> {
        self.file
            .sync_all()
            .map_err(|e| VfsError::IoError(format!("fsync: {}", e)))
    }
}

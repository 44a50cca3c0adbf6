/*!
 * In-Memory Filesystem Backend
 * Volatile tree used when no host root is configured
 */

use ahash::RandomState;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::normalize;
use super::traits::{FileSystem, OpenFile};
use super::types::*;

/// File contents shared by the tree and every open stream on the file
type Contents = Arc<RwLock<Vec<u8>>>;

#[derive(Debug, Clone)]
enum Node {
    File(Contents),
    Directory,
}

/// Shared in-memory tree
///
/// Cloning shares the same tree, so a test can keep a clone to inspect what
/// a runtime wrote. Open streams write straight into the node's contents:
/// every open of a path sees the same bytes, and an unlinked file lives on
/// only in the streams still holding it.
#[derive(Debug, Clone)]
pub struct MemFS {
    nodes: Arc<DashMap<PathBuf, Node, RandomState>>,
}

impl MemFS {
    /// Create new in-memory filesystem containing only `/`
    pub fn new() -> Self {
        let nodes = DashMap::with_hasher(RandomState::new());
        nodes.insert(PathBuf::from("/"), Node::Directory);

        Self {
            nodes: Arc::new(nodes),
        }
    }

    fn ensure_parent_dir(&self, path: &Path) -> VfsResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("/"));
        match self.nodes.get(parent).map(|n| n.value().clone()) {
            Some(Node::Directory) => Ok(()),
            Some(Node::File(_)) => Err(VfsError::NotADirectory(parent.display().to_string())),
            None => Err(VfsError::NotFound(parent.display().to_string())),
        }
    }

    fn children(&self, dir: &Path) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self
            .nodes
            .iter()
            .filter(|item| item.key().parent() == Some(dir))
            .filter_map(|item| {
                let name = item.key().file_name()?.to_string_lossy().into_owned();
                let file_type = match item.value() {
                    Node::File(_) => FileType::File,
                    Node::Directory => FileType::Directory,
                };
                Some(Entry::new(name, file_type))
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Contents of an existing file, honoring `create_new` and `truncate`
    fn existing_file(node: &Node, path: &Path, flags: OpenFlags) -> VfsResult<Contents> {
        match node {
            Node::Directory => Err(VfsError::IsADirectory(path.display().to_string())),
            Node::File(_) if flags.create_new => {
                Err(VfsError::AlreadyExists(path.display().to_string()))
            }
            Node::File(contents) => {
                if flags.truncate && flags.write {
                    contents.write().clear();
                }
                Ok(Arc::clone(contents))
            }
        }
    }
}

impl Default for MemFS {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MemFS {
    fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<Box<dyn OpenFile>> {
        let path = normalize(path);

        let existing = self.nodes.get(&path).map(|n| n.value().clone());
        let contents = match existing {
            Some(node) => Self::existing_file(&node, &path, flags)?,
            None if flags.create => {
                // Parent lookup must happen before the entry lock is taken
                self.ensure_parent_dir(&path)?;
                match self.nodes.entry(path.clone()) {
                    MapEntry::Vacant(slot) => {
                        let contents = Contents::default();
                        slot.insert(Node::File(Arc::clone(&contents)));
                        contents
                    }
                    MapEntry::Occupied(slot) => Self::existing_file(slot.get(), &path, flags)?,
                }
            }
            None => return Err(VfsError::NotFound(path.display().to_string())),
        };

        let pos = if flags.append {
            contents.read().len() as u64
        } else {
            0
        };

        Ok(Box::new(MemFile {
            contents,
            pos,
            flags,
        }))
    }

    fn read_dir(&self, path: &Path) -> VfsResult<Vec<Entry>> {
        let path = normalize(path);
        match self.nodes.get(&path).map(|n| n.value().clone()) {
            Some(Node::Directory) => Ok(self.children(&path)),
            Some(Node::File(_)) => Err(VfsError::NotADirectory(path.display().to_string())),
            None => Err(VfsError::NotFound(path.display().to_string())),
        }
    }

    fn metadata(&self, path: &Path) -> VfsResult<Metadata> {
        let path = normalize(path);
        match self.nodes.get(&path).map(|n| n.value().clone()) {
            Some(Node::File(contents)) => Ok(Metadata {
                file_type: FileType::File,
                size: contents.read().len() as u64,
            }),
            Some(Node::Directory) => Ok(Metadata {
                file_type: FileType::Directory,
                size: 0,
            }),
            None => Err(VfsError::NotFound(path.display().to_string())),
        }
    }

    fn remove_file(&self, path: &Path) -> VfsResult<()> {
        let path = normalize(path);
        match self.nodes.get(&path).map(|n| n.value().clone()) {
            Some(Node::File(_)) => {
                self.nodes.remove(&path);
                Ok(())
            }
            Some(Node::Directory) => Err(VfsError::IsADirectory(path.display().to_string())),
            None => Err(VfsError::NotFound(path.display().to_string())),
        }
    }

    fn create_dir(&self, path: &Path) -> VfsResult<()> {
        let path = normalize(path);
        if self.nodes.contains_key(&path) {
            return Err(VfsError::AlreadyExists(path.display().to_string()));
        }
        self.ensure_parent_dir(&path)?;
        self.nodes.insert(path, Node::Directory);
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> VfsResult<()> {
        let path = normalize(path);
        match self.nodes.get(&path).map(|n| n.value().clone()) {
            Some(Node::Directory) if path == Path::new("/") => {
                Err(VfsError::PermissionDenied("cannot remove root".to_string()))
            }
            Some(Node::Directory) => {
                if !self.children(&path).is_empty() {
                    return Err(VfsError::NotEmpty(path.display().to_string()));
                }
                self.nodes.remove(&path);
                Ok(())
            }
            Some(Node::File(_)) => Err(VfsError::NotADirectory(path.display().to_string())),
            None => Err(VfsError::NotFound(path.display().to_string())),
        }
    }

    fn name(&self) -> &str {
        "memfs"
    }
}

/// In-memory file stream with its own cursor over shared contents
struct MemFile {
    contents: Contents,
    pos: u64,
    flags: OpenFlags,
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.flags.read {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "stream was opened write-only",
            ));
        }
        let data = self.contents.read();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !self.flags.write {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "stream was opened read-only",
            ));
        }
        let mut data = self.contents.write();
        if self.flags.append {
            self.pos = data.len() as u64;
        }
        let start = self.pos as usize;
        let end = start + buf.len();
        if data.len() < end {
            // Writing past the end leaves a zero-filled gap
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => (self.contents.read().len() as u64).checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(offset) => {
                self.pos = offset;
                Ok(offset)
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before the start of the file",
            )),
        }
    }
}

impl OpenFile for MemFile {
    /// Writes already land in the shared contents
    fn sync(&mut self) -> VfsResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(fs: &MemFS, path: &str) -> Vec<u8> {
        let mut file = fs.open(Path::new(path), OpenFlags::read_only()).unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_create_write_read() {
        let fs = MemFS::new();
        {
            let mut file = fs.open(Path::new("/a.txt"), OpenFlags::create()).unwrap();
            file.write_all(b"hello").unwrap();
        }
        assert_eq!(read_all(&fs, "/a.txt"), b"hello");
        assert_eq!(fs.metadata(Path::new("a.txt")).unwrap().size, 5);
    }

    #[test]
    fn test_open_missing_without_create() {
        let fs = MemFS::new();
        let result = fs.open(Path::new("/missing"), OpenFlags::read_only());
        assert!(matches!(result, Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_append_mode() {
        let fs = MemFS::new();
        {
            let mut file = fs.open(Path::new("/log"), OpenFlags::create()).unwrap();
            file.write_all(b"one,").unwrap();
        }
        {
            let mut file = fs
                .open(Path::new("/log"), OpenFlags::from_mode("a").unwrap())
                .unwrap();
            file.seek(SeekFrom::Start(0)).unwrap();
            file.write_all(b"two").unwrap();
        }
        assert_eq!(read_all(&fs, "/log"), b"one,two");
    }

    #[test]
    fn test_directories() {
        let fs = MemFS::new();
        fs.create_dir(Path::new("/d")).unwrap();
        fs.open(Path::new("/d/x"), OpenFlags::create()).unwrap();
        fs.create_dir(Path::new("/d/sub")).unwrap();

        let names: Vec<_> = fs
            .read_dir(Path::new("/d"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["sub".to_string(), "x".to_string()]);

        assert!(matches!(
            fs.remove_dir(Path::new("/d")),
            Err(VfsError::NotEmpty(_))
        ));
        fs.remove_file(Path::new("/d/x")).unwrap();
        fs.remove_dir(Path::new("/d/sub")).unwrap();
        fs.remove_dir(Path::new("/d")).unwrap();
        assert!(!fs.exists(Path::new("/d")));
    }

    #[test]
    fn test_unlink_while_open_stays_unlinked() {
        let fs = MemFS::new();
        let mut file = fs.open(Path::new("/t"), OpenFlags::create()).unwrap();
        file.write_all(b"doomed").unwrap();

        fs.remove_file(Path::new("/t")).unwrap();
        // The open stream still works on the orphaned contents
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(b"still here").unwrap();
        file.sync().unwrap();
        file.flush().unwrap();
        drop(file);

        assert!(!fs.exists(Path::new("/t")));
    }

    #[test]
    fn test_removed_parent_is_not_repopulated() {
        let fs = MemFS::new();
        fs.create_dir(Path::new("/d")).unwrap();
        let mut file = fs.open(Path::new("/d/f"), OpenFlags::create()).unwrap();
        file.write_all(b"x").unwrap();

        fs.remove_file(Path::new("/d/f")).unwrap();
        fs.remove_dir(Path::new("/d")).unwrap();
        drop(file);

        assert!(!fs.exists(Path::new("/d/f")));
        assert!(!fs.exists(Path::new("/d")));
    }

    #[test]
    fn test_opens_share_contents() {
        let fs = MemFS::new();
        let mut a = fs.open(Path::new("/shared"), OpenFlags::create()).unwrap();
        let mut b = fs.open(Path::new("/shared"), OpenFlags::read_write()).unwrap();

        a.write_all(b"from a").unwrap();
        b.seek(SeekFrom::End(0)).unwrap();
        b.write_all(b", from b").unwrap();
        drop(b);
        drop(a);

        assert_eq!(read_all(&fs, "/shared"), b"from a, from b");
    }

    #[test]
    fn test_seek_past_end_then_write_fills_gap() {
        let fs = MemFS::new();
        let mut file = fs.open(Path::new("/gap"), OpenFlags::create()).unwrap();
        file.seek(SeekFrom::Start(3)).unwrap();
        file.write_all(b"z").unwrap();
        assert!(file.seek(SeekFrom::Current(-10)).is_err());
        drop(file);

        assert_eq!(read_all(&fs, "/gap"), b"\0\0\0z");
    }

    #[test]
    fn test_create_requires_parent() {
        let fs = MemFS::new();
        let result = fs.open(Path::new("/no/such/file"), OpenFlags::create());
        assert!(matches!(result, Err(VfsError::NotFound(_))));
    }
}

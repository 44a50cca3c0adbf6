/*!
 * VFS Types
 * Open flags, directory entries, metadata and host-side errors
 */

use nix::fcntl::OFlag;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host filesystem result
#[must_use = "VFS operations can fail and must be handled"]
pub type VfsResult<T> = Result<T, VfsError>;

/// Host filesystem errors
///
/// These never cross the POSIX-shaped boundary; `PosixError` translates them.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum VfsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

// =============================================================================
// OPEN FLAGS
// =============================================================================

/// File open flags
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl OpenFlags {
    #[inline]
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn write_only() -> Self {
        Self {
            write: true,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    /// Write + create + truncate, the `creat()` combination
    #[inline]
    #[must_use]
    pub fn create() -> Self {
        Self {
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        }
    }

    /// Parse `open(2)` flag bits
    ///
    /// Returns `None` for an access mode outside O_RDONLY/O_WRONLY/O_RDWR.
    pub fn from_posix(bits: i32) -> Option<Self> {
        let flags = OFlag::from_bits_truncate(bits);
        let access = flags & OFlag::O_ACCMODE;

        let (read, write) = if access == OFlag::O_RDONLY {
            (true, false)
        } else if access == OFlag::O_WRONLY {
            (false, true)
        } else if access == OFlag::O_RDWR {
            (true, true)
        } else {
            return None;
        };

        let create = flags.contains(OFlag::O_CREAT);
        Some(Self {
            read,
            write,
            append: flags.contains(OFlag::O_APPEND),
            truncate: flags.contains(OFlag::O_TRUNC),
            create,
            create_new: create && flags.contains(OFlag::O_EXCL),
        })
    }

    /// Parse an `fopen(3)` mode string; `b` is accepted and ignored
    pub fn from_mode(mode: &str) -> Option<Self> {
        let mode: String = mode.chars().filter(|c| *c != 'b').collect();
        let flags = match mode.as_str() {
            "r" => Self::read_only(),
            "w" => Self::create(),
            "a" => Self {
                write: true,
                append: true,
                create: true,
                ..Default::default()
            },
            "r+" => Self::read_write(),
            "w+" => Self {
                read: true,
                ..Self::create()
            },
            "a+" => Self {
                read: true,
                write: true,
                append: true,
                create: true,
                ..Default::default()
            },
            _ => return None,
        };
        Some(flags)
    }
}

// =============================================================================
// ENTRIES AND METADATA
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    #[default]
    File,
    Directory,
}

/// Directory entry as returned by `readdir`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub file_type: FileType,
}

impl Entry {
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            name: name.into(),
            file_type,
        }
    }

    #[inline]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub file_type: FileType,
    pub size: u64,
}

impl Metadata {
    #[inline]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }
}

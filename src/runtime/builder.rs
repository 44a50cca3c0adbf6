/*!
 * Runtime Builder
 * Builder pattern for Runtime construction
 */

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing::info;

use super::Runtime;
use crate::config::RuntimeConfig;
use crate::core::id::{Handle, HandleCategory};
use crate::core::limits::RESERVED_STDIO_HANDLES;
use crate::handles::HandleTable;
use crate::resources::{Resource, Stream};
use crate::vfs::{FileSystem, LocalFS, MemFS, OpenFile, OpenFlags, StdStream};

/// Replacement standard streams
struct StdioSet {
    stdin: Box<dyn OpenFile>,
    stdout: Box<dyn OpenFile>,
    stderr: Box<dyn OpenFile>,
}

/// Builder for Runtime
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    filesystem: Option<Arc<dyn FileSystem>>,
    stdio: Option<StdioSet>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            filesystem: None,
            stdio: None,
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Serve paths from `fs` instead of the one `fs_root` selects
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.filesystem = Some(fs);
        self
    }

    /// Install these streams at handles 0, 1 and 2 instead of the process ones
    pub fn with_stdio(
        mut self,
        stdin: Box<dyn OpenFile>,
        stdout: Box<dyn OpenFile>,
        stderr: Box<dyn OpenFile>,
    ) -> Self {
        self.stdio = Some(StdioSet {
            stdin,
            stdout,
            stderr,
        });
        self
    }

    /// Build the Runtime
    pub fn build(self) -> Runtime {
        let config = self.config;

        let fs: Arc<dyn FileSystem> = match (self.filesystem, &config.fs_root) {
            (Some(fs), _) => fs,
            (None, Some(root)) => Arc::new(LocalFS::new(root.clone())),
            (None, None) => Arc::new(MemFS::new()),
        };

        let reserved = if config.reserve_stdio {
            RESERVED_STDIO_HANDLES
        } else {
            0
        };
        let files = HandleTable::new(HandleCategory::File, reserved, config.max_file_handles);
        let sync = HandleTable::new(HandleCategory::Sync, 0, config.max_sync_handles);

        if config.reserve_stdio {
            let stdio = self.stdio.unwrap_or_else(|| StdioSet {
                stdin: StdStream::Stdin.boxed(),
                stdout: StdStream::Stdout.boxed(),
                stderr: StdStream::Stderr.boxed(),
            });
            let streams = [
                (Handle::STDIN, "<stdin>", OpenFlags::read_only(), stdio.stdin),
                (Handle::STDOUT, "<stdout>", OpenFlags::write_only(), stdio.stdout),
                (Handle::STDERR, "<stderr>", OpenFlags::write_only(), stdio.stderr),
            ];
            for (handle, name, flags, file) in streams {
                // The table is fresh, so the reserved slots are free
                let _ = files.install(handle, Resource::Stream(Stream::new(name, flags, file)));
            }
        }

        info!(
            filesystem = fs.name(),
            max_file_handles = config.max_file_handles,
            max_sync_handles = config.max_sync_handles,
            stdio = config.reserve_stdio,
            "runtime initialized"
        );

        Runtime {
            files,
            sync,
            fs,
            config,
            thread_seq: AtomicU64::new(0),
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

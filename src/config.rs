/*!
 * Runtime Configuration
 * Table capacities and host filesystem selection, with environment overrides
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::core::limits::{DEFAULT_MAX_FILE_HANDLES, DEFAULT_MAX_SYNC_HANDLES};

pub const ENV_MAX_FDS: &str = "POSIX_COMPAT_MAX_FDS";
pub const ENV_MAX_SYNC: &str = "POSIX_COMPAT_MAX_SYNC";
pub const ENV_ROOT: &str = "POSIX_COMPAT_ROOT";
pub const ENV_TRACE_JSON: &str = "POSIX_COMPAT_TRACE_JSON";

/// Settings for a `Runtime`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Capacity of the file-category table, including the stdio slots
    pub max_file_handles: u32,
    /// Capacity of the sync-category table
    pub max_sync_handles: u32,
    /// Pre-open stdin/stdout/stderr at handles 0, 1, 2
    pub reserve_stdio: bool,
    /// Host directory backing paths; an in-memory filesystem when unset
    pub fs_root: Option<PathBuf>,
    /// Emit JSON log lines
    pub trace_json: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_file_handles: DEFAULT_MAX_FILE_HANDLES,
            max_sync_handles: DEFAULT_MAX_SYNC_HANDLES,
            reserve_stdio: true,
            fs_root: None,
            trace_json: false,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `POSIX_COMPAT_*` environment variables
    ///
    /// A malformed value is logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_file_handles: parse_var(ENV_MAX_FDS).unwrap_or(defaults.max_file_handles),
            max_sync_handles: parse_var(ENV_MAX_SYNC).unwrap_or(defaults.max_sync_handles),
            reserve_stdio: defaults.reserve_stdio,
            fs_root: std::env::var_os(ENV_ROOT)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            trace_json: std::env::var(ENV_TRACE_JSON)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.trace_json),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring malformed environment override");
            None
        }
    }
}

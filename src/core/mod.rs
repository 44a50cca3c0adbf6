/*!
 * Core Module
 * Handles, errors, errno, deadlines and limits shared by every other module
 */

pub mod errno;
pub mod errors;
pub mod id;
pub mod limits;
pub mod time;

// Re-export for convenience
pub use errors::{PosixError, PosixResult, Target};
pub use id::{Handle, HandleAllocator, HandleCategory};
pub use time::{Deadline, Timespec};

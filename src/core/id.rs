/*!
 * Handle Identifiers
 * Type-safe handle wrapper and a recycling allocator for handle values
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicU32, Ordering};

// ============================================================================
// Type-Safe Handle Wrapper
// ============================================================================

/// Small integer naming a live resource, analogous to a file descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub i32);

impl Handle {
    pub const STDIN: Handle = Handle(0);
    pub const STDOUT: Handle = Handle(1);
    pub const STDERR: Handle = Handle(2);

    /// Raw value as seen by C callers
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Handle {
    fn from(raw: i32) -> Self {
        Handle(raw)
    }
}

/// Handle namespace. Values are unique within a category only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleCategory {
    /// Streams and directory streams (file descriptors)
    File,
    /// Mutexes, condition variables, semaphores, once guards, join targets
    Sync,
}

impl fmt::Display for HandleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleCategory::File => write!(f, "file"),
            HandleCategory::Sync => write!(f, "sync"),
        }
    }
}

// ============================================================================
// Recycling Allocator
// ============================================================================

/// Handle value allocator with recycling support
///
/// Hands out values monotonically from an atomic counter and reuses released
/// values from a lock-free queue before touching the counter again.
///
/// # Performance
/// - Lock-free allocation and recycling via SegQueue
/// - Counter is bounded by `capacity`; once both the counter and the free
///   list are exhausted `next()` returns `None`
/// - `capacity` is clamped to `i32::MAX` so no handle value is negative
pub struct HandleAllocator {
    counter: AtomicU32,
    free_list: SegQueue<i32>,
    capacity: u32,
}

impl HandleAllocator {
    /// Create allocator whose first fresh value is `start`
    #[inline]
    pub fn new(start: u32, capacity: u32) -> Self {
        Self {
            counter: AtomicU32::new(start),
            free_list: SegQueue::new(),
            capacity: capacity.min(i32::MAX as u32),
        }
    }

    /// Next handle value, preferring recycled ones
    pub fn next(&self) -> Option<i32> {
        if let Some(id) = self.free_list.pop() {
            return Some(id);
        }

        let capacity = self.capacity;
        self.counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < capacity).then_some(current + 1)
            })
            .ok()
            .map(|id| id as i32)
    }

    /// Return a released value for reuse
    #[inline]
    pub fn recycle(&self, id: i32) {
        self.free_list.push(id);
    }

    /// Values below this mark have been handed out at least once
    #[inline]
    pub fn high_water(&self) -> i32 {
        self.counter.load(Ordering::SeqCst) as i32
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_allocation() {
        let alloc = HandleAllocator::new(3, 16);

        assert_eq!(alloc.next(), Some(3));
        assert_eq!(alloc.next(), Some(4));
        assert_eq!(alloc.next(), Some(5));
        assert_eq!(alloc.high_water(), 6);
    }

    #[test]
    fn test_recycling() {
        let alloc = HandleAllocator::new(0, 16);

        let a = alloc.next().unwrap();
        let b = alloc.next().unwrap();
        assert_eq!((a, b), (0, 1));

        alloc.recycle(a);
        assert_eq!(alloc.next(), Some(0));
        assert_eq!(alloc.next(), Some(2)); // Back to counter
    }

    #[test]
    fn test_capacity_exhaustion() {
        let alloc = HandleAllocator::new(0, 2);

        assert!(alloc.next().is_some());
        assert!(alloc.next().is_some());
        assert_eq!(alloc.next(), None);

        alloc.recycle(1);
        assert_eq!(alloc.next(), Some(1));
        assert_eq!(alloc.next(), None);
    }

    #[test]
    fn test_capacity_clamped_to_positive_handles() {
        let alloc = HandleAllocator::new(i32::MAX as u32 - 1, u32::MAX);
        assert_eq!(alloc.capacity(), i32::MAX as u32);

        assert_eq!(alloc.next(), Some(i32::MAX - 1));
        // i32::MAX itself would be the next value; the counter stops before it
        assert_eq!(alloc.next(), None);
        assert!(alloc.high_water() > 0);
    }
}

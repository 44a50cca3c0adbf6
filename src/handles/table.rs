/*!
 * Handle Table
 * Concurrent registry mapping small integer handles to live resources
 */

use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::core::errors::{PosixError, PosixResult};
use crate::core::id::{Handle, HandleAllocator, HandleCategory};

/// Registry of live resources within one handle category
///
/// Lookups hand out `Arc` clones, so an object stays alive for callers that
/// resolved it before a concurrent release. A released value is only put
/// back into circulation after its entry is gone, which keeps every handle
/// unique among the live ones.
///
/// # Performance
///
/// - Sharded map for lookups (no global lock on the hot path)
/// - Lock-free allocation and recycling of handle values
pub struct HandleTable<T> {
    category: HandleCategory,
    entries: DashMap<Handle, Arc<T>, RandomState>,
    allocator: HandleAllocator,
    reserved: u32,
}

impl<T> HandleTable<T> {
    /// Create a table holding up to `capacity` handles, the first `reserved`
    /// of which are only filled through `install`
    pub fn new(category: HandleCategory, reserved: u32, capacity: u32) -> Self {
        Self {
            category,
            entries: DashMap::with_hasher(RandomState::new()),
            allocator: HandleAllocator::new(reserved, capacity.max(reserved)),
            reserved,
        }
    }

    #[inline]
    pub fn category(&self) -> HandleCategory {
        self.category
    }

    /// Insert a resource under a fresh handle, or `None` when the table is full
    pub fn try_allocate(&self, resource: T) -> Option<Handle> {
        let resource = Arc::new(resource);
        loop {
            let handle = Handle(self.allocator.next()?);
            // A recycled reserved slot may have been re-filled through `install`
            if let Entry::Vacant(slot) = self.entries.entry(handle) {
                slot.insert(resource);
                trace!(category = %self.category, handle = %handle, "handle allocated");
                return Some(handle);
            }
        }
    }

    /// Insert a resource under a fresh handle
    ///
    /// Running out of handles is unrecoverable: the process aborts.
    pub fn allocate(&self, resource: T) -> Handle {
        match self.try_allocate(resource) {
            Some(handle) => handle,
            None => {
                error!(
                    category = %self.category,
                    capacity = self.allocator.capacity(),
                    "handle table exhausted, aborting"
                );
                std::process::abort();
            }
        }
    }

    /// Place a resource in one of the reserved slots (standard streams)
    pub fn install(&self, handle: Handle, resource: T) -> PosixResult<()> {
        if handle.0 < 0 || handle.0 as u32 >= self.reserved {
            return Err(PosixError::invalid(format!(
                "handle {} is not a reserved slot",
                handle
            )));
        }
        if self.entries.contains_key(&handle) {
            return Err(PosixError::Busy);
        }
        self.entries.insert(handle, Arc::new(resource));
        debug!(category = %self.category, handle = %handle, "reserved handle installed");
        Ok(())
    }

    /// Resolve a handle to its resource
    pub fn lookup(&self, handle: Handle) -> PosixResult<Arc<T>> {
        match self.entries.get(&handle) {
            Some(entry) => Ok(Arc::clone(entry.value())),
            None => Err(self.missing(handle)),
        }
    }

    /// Remove a handle, returning the resource so the caller can finalize it
    pub fn release(&self, handle: Handle) -> PosixResult<Arc<T>> {
        let (_, resource) = self
            .entries
            .remove(&handle)
            .ok_or_else(|| self.missing(handle))?;

        self.allocator.recycle(handle.0);
        trace!(category = %self.category, handle = %handle, "handle released");
        Ok(resource)
    }

    /// Remove `handle` only while it still names `expected`
    ///
    /// A caller that resolved a handle and then released it by number could
    /// otherwise remove an unrelated resource that reused the value meanwhile.
    pub fn release_if(&self, handle: Handle, expected: &Arc<T>) -> PosixResult<Arc<T>> {
        self.release_checked(handle, expected, |_| Ok(()))
    }

    /// `release_if` with a veto evaluated while the entry is locked
    ///
    /// `check` runs under the shard lock, so a resolved-then-checked handle is
    /// removed atomically with the check. It must not touch this table.
    pub fn release_checked<F>(&self, handle: Handle, expected: &Arc<T>, check: F) -> PosixResult<Arc<T>>
    where
        F: FnOnce(&T) -> PosixResult<()>,
    {
        let mut verdict = Ok(());
        let removed = self.entries.remove_if(&handle, |_, current| {
            if !Arc::ptr_eq(current, expected) {
                return false;
            }
            verdict = check(current.as_ref());
            verdict.is_ok()
        });
        verdict?;

        match removed {
            Some((_, resource)) => {
                self.allocator.recycle(handle.0);
                trace!(category = %self.category, handle = %handle, "handle released");
                Ok(resource)
            }
            // Gone, or already naming another resource: ours was closed
            None => Err(PosixError::AlreadyClosed(handle)),
        }
    }

    /// Remove every live handle (teardown)
    pub fn drain(&self) -> Vec<(Handle, Arc<T>)> {
        let handles: Vec<Handle> = self.entries.iter().map(|e| *e.key()).collect();
        handles
            .into_iter()
            .filter_map(|h| self.release(h).ok().map(|r| (h, r)))
            .collect()
    }

    /// Number of live handles
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handles ever handed out are "closed" once gone, anything else never existed
    fn missing(&self, handle: Handle) -> PosixError {
        if handle.0 >= 0 && handle.0 < self.allocator.high_water() {
            PosixError::AlreadyClosed(handle)
        } else {
            PosixError::missing_handle(handle)
        }
    }
}

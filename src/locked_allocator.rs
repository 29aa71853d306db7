//! Shared buddy allocator.
//!
//! This module wraps [`BuddyAllocator`] in a single spinlock so that one
//! allocator can be used from several CPUs or threads. Each call holds the
//! lock for its entire body, so no caller observes a half-split or
//! half-merged free list.

use alloc::collections::BTreeMap;

use kspin::{SpinNoIrq, SpinNoIrqGuard};

use crate::buddy::{BuddyAllocator, BuddyStats, FreeListDump, InvariantViolation};
use crate::{Block, BuddyResult};

/// Buddy allocator behind a `SpinNoIrq` lock
pub struct LockedBuddyAllocator {
    inner: SpinNoIrq<BuddyAllocator>,
}

impl LockedBuddyAllocator {
    /// Create a locked allocator for a fresh region
    pub fn new(memory_size: usize, limit_divisions: u32) -> BuddyResult<Self> {
        BuddyAllocator::new(memory_size, limit_divisions).map(Self::from_allocator)
    }

    /// Wrap an existing allocator, keeping its current state
    pub const fn from_allocator(allocator: BuddyAllocator) -> Self {
        Self {
            inner: SpinNoIrq::new(allocator),
        }
    }

    /// Allocate a block of at least `size` units
    pub fn alloc(&self, size: usize) -> BuddyResult<Block> {
        self.inner.lock().alloc(size)
    }

    /// Release the block starting at `addr`
    pub fn free(&self, addr: usize) -> BuddyResult {
        self.inner.lock().free(addr)
    }

    pub fn dump_free_lists(&self) -> FreeListDump {
        self.inner.lock().dump_free_lists()
    }

    pub fn dump_allocated(&self) -> BTreeMap<usize, usize> {
        self.inner.lock().dump_allocated()
    }

    /// Get memory statistics
    pub fn stats(&self) -> BuddyStats {
        self.inner.lock().stats()
    }

    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.inner.lock().verify()
    }

    /// Lock the allocator for a sequence of operations that must not interleave
    pub fn lock(&self) -> SpinNoIrqGuard<'_, BuddyAllocator> {
        self.inner.lock()
    }
}

impl From<BuddyAllocator> for LockedBuddyAllocator {
    fn from(allocator: BuddyAllocator) -> Self {
        Self::from_allocator(allocator)
    }
}

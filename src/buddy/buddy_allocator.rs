//! Buddy allocator over a fixed offset range
//!
//! Owns the free-list table of the region `[0, memory_size)` together with the
//! table of live allocations, and enforces the caller-facing contract:
//! request rounding, size limits and double-free detection.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use crate::{BuddyError, BuddyResult, RegionAllocator};

#[cfg(feature = "log")]
use log::{debug, error, info, warn};

use super::{
    buddy_block::Block,
    buddy_set::BuddySet,
    stats::BuddyStats,
    verify::{verify_layout, InvariantViolation},
};

#[cfg(feature = "tracking")]
use super::stats::MemoryStatsReporter;

/// Free lists as reported by [`BuddyAllocator::dump_free_lists`]: one entry per
/// size class from largest to smallest, each with its sorted free offsets.
pub type FreeListDump = Vec<(usize, Vec<usize>)>;

/// Buddy allocator for a single power-of-two region
///
/// Block sizes range from `memory_size` down to
/// `min_block_size = memory_size >> limit_divisions`.
pub struct BuddyAllocator {
    memory_size: usize,
    limit_divisions: u32,
    min_block_size: usize,
    free: BuddySet,
    /// Live allocations: start offset to reserved block size
    allocated: BTreeMap<usize, usize>,
    used_bytes: usize,
}

impl BuddyAllocator {
    /// Create an allocator whose whole region is one free block at offset 0.
    pub fn new(memory_size: usize, limit_divisions: u32) -> BuddyResult<Self> {
        if memory_size == 0 || !memory_size.is_power_of_two() {
            error!(
                "buddy allocator: memory size {:#x} is not a positive power of two",
                memory_size
            );
            return Err(BuddyError::InvalidConfig);
        }

        let min_block_size = match memory_size.checked_shr(limit_divisions) {
            Some(size) if size >= 1 => size,
            _ => {
                error!(
                    "buddy allocator: {} divisions too deep for memory size {:#x}",
                    limit_divisions, memory_size
                );
                return Err(BuddyError::InvalidConfig);
            }
        };

        debug!(
            "buddy allocator: region {:#x}, min block {:#x}, {} size classes",
            memory_size,
            min_block_size,
            limit_divisions + 1
        );

        Ok(Self {
            memory_size,
            limit_divisions,
            min_block_size,
            free: BuddySet::new(min_block_size, limit_divisions as usize),
            allocated: BTreeMap::new(),
            used_bytes: 0,
        })
    }

    pub const fn memory_size(&self) -> usize {
        self.memory_size
    }

    pub const fn limit_divisions(&self) -> u32 {
        self.limit_divisions
    }

    pub const fn min_block_size(&self) -> usize {
        self.min_block_size
    }

    /// Number of size classes, `limit_divisions + 1`
    pub const fn size_class_count(&self) -> usize {
        self.limit_divisions as usize + 1
    }

    /// Valid block sizes from largest to smallest
    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..=self.free.max_order())
            .rev()
            .map(move |order| self.free.block_size(order))
    }

    /// Allocate a block of at least `size` units.
    ///
    /// The request is rounded up to a power of two no smaller than
    /// `min_block_size`. Among free blocks of the same size the oldest one is
    /// used.
    pub fn alloc(&mut self, size: usize) -> BuddyResult<Block> {
        if size == 0 {
            return Err(BuddyError::InvalidSize);
        }

        let target = match size.checked_next_power_of_two() {
            Some(target) if target <= self.memory_size => target.max(self.min_block_size),
            _ => {
                debug!(
                    "buddy allocator: request {:#x} exceeds region {:#x}",
                    size, self.memory_size
                );
                return Err(BuddyError::Unsatisfiable);
            }
        };

        let order = (target / self.min_block_size).trailing_zeros() as usize;
        let Some(addr) = self.free.alloc_block(order) else {
            debug!(
                "buddy allocator: Allocation failure: {:#x} (rounded to {:#x})",
                size, target
            );
            #[cfg(feature = "tracking")]
            MemoryStatsReporter::print_alloc_failure_stats(&self.stats(), size, target);
            return Err(BuddyError::OutOfMemory);
        };

        self.allocated.insert(addr, target);
        self.used_bytes += target;
        Ok(Block::new(addr, target))
    }

    /// Release the block that starts at `addr`, merging it with free buddies.
    ///
    /// Fails with [`BuddyError::InvalidFree`] if `addr` is not the start of a
    /// live allocation, including a second free of the same block.
    pub fn free(&mut self, addr: usize) -> BuddyResult {
        let Some(size) = self.allocated.remove(&addr) else {
            warn!(
                "buddy allocator: Invalid or double free at {:#x}: address not allocated",
                addr
            );
            return Err(BuddyError::InvalidFree);
        };

        // Entries only ever come from alloc, so the size is always a class
        let order = (size / self.min_block_size).trailing_zeros() as usize;
        self.used_bytes -= size;
        let merged = self.free.dealloc_block(addr, order);
        debug!(
            "buddy allocator: freed [{:#x}, {:#x}), now free as [{:#x}, {:#x})",
            addr,
            addr + size,
            merged.addr,
            merged.end()
        );
        Ok(())
    }

    /// Free offsets of every size class, largest class first, each sorted.
    pub fn dump_free_lists(&self) -> FreeListDump {
        (0..=self.free.max_order())
            .rev()
            .map(|order| (self.free.block_size(order), self.free.sorted_free_blocks(order)))
            .collect()
    }

    /// Copy of the allocated-block table: start offset to block size.
    pub fn dump_allocated(&self) -> BTreeMap<usize, usize> {
        self.allocated.clone()
    }

    /// Whether `addr` is the start of a live allocation
    pub fn is_allocated(&self, addr: usize) -> bool {
        self.allocated.contains_key(&addr)
    }

    /// Reserved size of the live allocation starting at `addr`
    pub fn block_size_of(&self, addr: usize) -> Option<usize> {
        self.allocated.get(&addr).copied()
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }

    /// Largest size class that currently has a free block
    pub fn largest_free_block(&self) -> Option<usize> {
        (0..=self.free.max_order())
            .rev()
            .find(|&order| self.free.order_block_count(order) > 0)
            .map(|order| self.free.block_size(order))
    }

    /// Get statistics for this allocator
    pub fn stats(&self) -> BuddyStats {
        let mut stats = BuddyStats::new();
        stats.total_bytes = self.memory_size;
        stats.used_bytes = self.used_bytes;
        stats.free_bytes = self.memory_size - self.used_bytes;
        stats.allocated_blocks = self.allocated.len();
        stats.min_block_size = self.min_block_size;
        stats.num_orders = self.size_class_count();
        for order in 0..=self.free.max_order() {
            stats.free_blocks_by_order[order] = self.free.order_block_count(order);
        }
        stats
    }

    /// Check every layout invariant of the current state
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let free: Vec<Block> = self.free.free_blocks().collect();
        let allocated: Vec<Block> = self
            .allocated
            .iter()
            .map(|(&addr, &size)| Block::new(addr, size))
            .collect();
        verify_layout(self.memory_size, self.min_block_size, &free, &allocated)
    }

    /// Print the free lists and allocation summary
    pub fn print_free_lists(&self) {
        info!("========== Buddy Allocator Free Lists ==========");
        info!(
            "Region size: {:#x}, min block: {:#x}",
            self.memory_size, self.min_block_size
        );
        info!(
            "Allocated: {} blocks, {:#x} units",
            self.allocated.len(),
            self.used_bytes
        );
        for (size, addrs) in self.dump_free_lists() {
            if !addrs.is_empty() {
                info!("  Size {:#x}: {:x?}", size, addrs);
            }
        }
        info!("================================================");
    }
}

impl fmt::Display for BuddyAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<BuddyAllocator total={} min_block={} allocated={}>",
            self.memory_size,
            self.min_block_size,
            self.allocated.len()
        )
    }
}

impl fmt::Debug for BuddyAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuddyAllocator")
            .field("memory_size", &self.memory_size)
            .field("min_block_size", &self.min_block_size)
            .field("free_lists", &self.dump_free_lists())
            .field("allocated", &self.allocated)
            .finish()
    }
}

impl RegionAllocator for BuddyAllocator {
    fn alloc(&mut self, size: usize) -> BuddyResult<Block> {
        BuddyAllocator::alloc(self, size)
    }

    fn free(&mut self, addr: usize) -> BuddyResult {
        BuddyAllocator::free(self, addr)
    }

    fn total_bytes(&self) -> usize {
        self.memory_size
    }

    fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    fn available_bytes(&self) -> usize {
        self.free.free_units()
    }
}

//! Statistics and debugging for buddy allocator
//!
//! Provides usage statistics and failure reporting.

use super::buddy_block::MAX_SIZE_CLASSES;

#[cfg(feature = "log")]
use log::error;

/// Buddy system statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyStats {
    pub total_bytes: usize,
    pub free_bytes: usize,
    pub used_bytes: usize,
    pub allocated_blocks: usize,
    pub min_block_size: usize,
    /// Number of size classes in use; entries past this index are zero
    pub num_orders: usize,
    /// Free block count per order, order `k` holding blocks of `min_block_size << k`
    pub free_blocks_by_order: [usize; MAX_SIZE_CLASSES],
}

impl Default for BuddyStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BuddyStats {
    pub const fn new() -> Self {
        Self {
            total_bytes: 0,
            free_bytes: 0,
            used_bytes: 0,
            allocated_blocks: 0,
            min_block_size: 0,
            num_orders: 0,
            free_blocks_by_order: [0; MAX_SIZE_CLASSES],
        }
    }

    /// Free block count for a size class, zero for sizes that are not a class
    pub fn free_blocks_of_size(&self, size: usize) -> usize {
        if self.min_block_size == 0 || size < self.min_block_size || !size.is_power_of_two() {
            return 0;
        }
        let order = (size / self.min_block_size).trailing_zeros() as usize;
        if order < self.num_orders {
            self.free_blocks_by_order[order]
        } else {
            0
        }
    }

    /// Total number of free blocks over all size classes
    pub fn free_block_count(&self) -> usize {
        self.free_blocks_by_order[..self.num_orders].iter().sum()
    }
}

/// Detailed memory statistics reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Print detailed allocation failure statistics
    /// This is a standalone function to keep allocation logic clean
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(stats: &BuddyStats, request_size: usize, target_size: usize) {
        error!("========================================");
        error!(
            "Request: {:#x} units (rounded to {:#x})",
            request_size, target_size
        );
        error!("Overall Memory State:");
        error!("  Total: {:#x}", stats.total_bytes);
        error!("  Free: {:#x}", stats.free_bytes);
        error!(
            "  Used: {:#x} in {} blocks",
            stats.used_bytes, stats.allocated_blocks
        );
        error!("  Free blocks by size:");

        for order in (0..stats.num_orders).rev() {
            let count = stats.free_blocks_by_order[order];
            if count > 0 {
                let block_size = stats.min_block_size << order;
                error!(
                    "    Size {:#x}: {} blocks ({:#x} total)",
                    block_size,
                    count,
                    count * block_size
                );
            }
        }
        error!("========================================");
    }
}

//! Free-list table for a buddy region
//!
//! Implements block splitting and buddy merging over one FIFO free list per
//! size class. Size classes are indexed by order: order `k` holds blocks of
//! `min_block_size << k` units, and the top order covers the whole region.

use alloc::vec::Vec;

#[cfg(feature = "log")]
use log::{debug, error};

use super::{buddy_block::Block, free_list::FreeList};

/// A buddy set - the free lists of a single region
pub struct BuddySet {
    min_block_size: usize,
    max_order: usize,
    /// Free lists for each order
    free_lists: Vec<FreeList>,
}

impl BuddySet {
    /// Create a buddy set whose only free block is the whole region at offset 0.
    ///
    /// `min_block_size` must be a power of two and `min_block_size << max_order`
    /// must not overflow.
    pub fn new(min_block_size: usize, max_order: usize) -> Self {
        let mut free_lists = Vec::with_capacity(max_order + 1);
        free_lists.resize_with(max_order + 1, FreeList::new);
        free_lists[max_order].push_back(0);
        Self {
            min_block_size,
            max_order,
            free_lists,
        }
    }

    pub const fn max_order(&self) -> usize {
        self.max_order
    }

    /// Size in units of a block of the given order
    pub const fn block_size(&self, order: usize) -> usize {
        self.min_block_size << order
    }

    /// Order of a size class, or `None` if `size` is not one of this set's classes
    pub fn order_of(&self, size: usize) -> Option<usize> {
        if size < self.min_block_size || !size.is_power_of_two() {
            return None;
        }
        let order = (size / self.min_block_size).trailing_zeros() as usize;
        (order <= self.max_order).then_some(order)
    }

    /// Take a free block of `order_needed`, splitting a larger one if needed.
    ///
    /// Scans upward from `order_needed` for the first non-empty list, pops its
    /// oldest block and keeps the lower half at each split, queueing the upper
    /// half on the list one order down.
    pub fn alloc_block(&mut self, order_needed: usize) -> Option<usize> {
        if order_needed > self.max_order {
            return None;
        }

        let order = (order_needed..=self.max_order).find(|&o| !self.free_lists[o].is_empty())?;
        let addr = self.free_lists[order].pop_front()?;

        // Split down to required order
        let mut current = order;
        while current > order_needed {
            current -= 1;
            let buddy_addr = addr + self.block_size(current);
            debug!(
                "buddy set: split [{:#x}, {:#x}) into halves of {:#x}",
                addr,
                addr + self.block_size(current + 1),
                self.block_size(current)
            );
            self.free_lists[current].push_back(buddy_addr);
        }

        Some(addr)
    }

    /// Return a block to the set, merging with free buddies as far as possible.
    ///
    /// Returns the block that ended up in a free list.
    pub fn dealloc_block(&mut self, addr: usize, order: usize) -> Block {
        let mut current_addr = addr;
        let mut current_order = order;

        while current_order < self.max_order {
            let buddy_addr = current_addr ^ self.block_size(current_order);
            if !self.free_lists[current_order].remove(buddy_addr) {
                break;
            }
            debug!(
                "buddy set: merge {:#x} with buddy {:#x} at size {:#x}",
                current_addr,
                buddy_addr,
                self.block_size(current_order)
            );
            current_addr = current_addr.min(buddy_addr);
            current_order += 1;
        }

        if !self.free_lists[current_order].push_back(current_addr) {
            error!(
                "buddy set: failed to push block to free list: addr={:#x}, order={}",
                current_addr, current_order
            );
        }
        Block::new(current_addr, self.block_size(current_order))
    }

    /// Whether a block of this order starting at `addr` is free
    pub fn is_free(&self, addr: usize, order: usize) -> bool {
        order <= self.max_order && self.free_lists[order].contains(addr)
    }

    /// Whether `addr` starts a free block of any order
    pub fn is_free_anywhere(&self, addr: usize) -> bool {
        self.free_lists.iter().any(|list| list.contains(addr))
    }

    /// Get free blocks of a specific order, in FIFO order
    pub fn free_blocks_by_order(&self, order: usize) -> impl Iterator<Item = usize> + '_ {
        self.free_lists[order].iter()
    }

    /// Free blocks of a specific order, sorted by address
    pub fn sorted_free_blocks(&self, order: usize) -> Vec<usize> {
        self.free_lists[order].sorted()
    }

    /// Get the number of blocks in a specific order
    pub fn order_block_count(&self, order: usize) -> usize {
        if order <= self.max_order {
            self.free_lists[order].len()
        } else {
            0
        }
    }

    /// Every free block across all orders
    pub fn free_blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.free_lists.iter().enumerate().flat_map(move |(order, list)| {
            let size = self.block_size(order);
            list.iter().map(move |addr| Block::new(addr, size))
        })
    }

    /// Total units held in free lists
    pub fn free_units(&self) -> usize {
        (0..=self.max_order)
            .map(|order| self.free_lists[order].len() * self.block_size(order))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_initial_state() {
        let set = BuddySet::new(32, 6);
        assert_eq!(set.block_size(6), 2048);
        assert_eq!(set.sorted_free_blocks(6), vec![0]);
        for order in 0..6 {
            assert_eq!(set.order_block_count(order), 0);
        }
        assert_eq!(set.free_units(), 2048);
    }

    #[test]
    fn test_order_of() {
        let set = BuddySet::new(32, 6);
        assert_eq!(set.order_of(32), Some(0));
        assert_eq!(set.order_of(128), Some(2));
        assert_eq!(set.order_of(2048), Some(6));
        assert_eq!(set.order_of(16), None);
        assert_eq!(set.order_of(96), None);
        assert_eq!(set.order_of(4096), None);
    }

    #[test]
    fn test_split_pushes_upper_halves() {
        let mut set = BuddySet::new(32, 6);
        assert_eq!(set.alloc_block(2), Some(0));

        assert_eq!(set.order_block_count(6), 0);
        assert_eq!(set.sorted_free_blocks(5), vec![1024]);
        assert_eq!(set.sorted_free_blocks(4), vec![512]);
        assert_eq!(set.sorted_free_blocks(3), vec![256]);
        assert_eq!(set.sorted_free_blocks(2), vec![128]);
        assert_eq!(set.free_units(), 2048 - 128);
    }

    #[test]
    fn test_alloc_exhaustion() {
        let mut set = BuddySet::new(1, 1);
        assert_eq!(set.alloc_block(0), Some(0));
        assert_eq!(set.alloc_block(0), Some(1));
        assert_eq!(set.alloc_block(0), None);
        assert_eq!(set.alloc_block(2), None);
    }

    #[test]
    fn test_merge_back_to_top() {
        let mut set = BuddySet::new(32, 6);
        let addr = set.alloc_block(0).unwrap();
        let merged = set.dealloc_block(addr, 0);
        assert_eq!(merged, Block::new(0, 2048));
        assert_eq!(set.sorted_free_blocks(6), vec![0]);
        assert!(set.is_free(0, 6));
        assert_eq!(set.free_blocks().count(), 1);
    }

    #[test]
    fn test_merge_stops_at_allocated_buddy() {
        let mut set = BuddySet::new(16, 2);
        let a = set.alloc_block(0).unwrap();
        let b = set.alloc_block(0).unwrap();
        assert_eq!((a, b), (0, 16));

        let merged = set.dealloc_block(a, 0);
        assert_eq!(merged, Block::new(0, 16));
        assert!(set.is_free_anywhere(0));
        assert!(!set.is_free(0, 1));
    }

    #[test]
    fn test_free_blocks_keep_fifo_order() {
        let mut set = BuddySet::new(16, 2);
        let addrs: Vec<_> = (0..4).map(|_| set.alloc_block(0).unwrap()).collect();
        assert_eq!(addrs, vec![0, 16, 32, 48]);

        set.dealloc_block(48, 0);
        set.dealloc_block(16, 0);
        let fifo: Vec<_> = set.free_blocks_by_order(0).collect();
        assert_eq!(fifo, vec![48, 16]);
        assert_eq!(set.sorted_free_blocks(0), vec![16, 48]);
    }
}

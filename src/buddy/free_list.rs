//! FIFO free list for a single size class
//!
//! Blocks are handed out oldest-freed-first: `pop_front` takes the block that
//! has been waiting longest, `push_back` queues a newly freed or split block.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

#[cfg(feature = "log")]
use log::error;

/// Free list - start offsets of free blocks of one size class, in FIFO order
#[derive(Debug, Clone, Default)]
pub struct FreeList {
    blocks: VecDeque<usize>,
}

impl FreeList {
    /// Create a new empty free list
    pub const fn new() -> Self {
        Self {
            blocks: VecDeque::new(),
        }
    }

    /// Queue a block at the back of the list.
    ///
    /// Returns `false` and leaves the list untouched if `addr` is already present.
    pub fn push_back(&mut self, addr: usize) -> bool {
        if self.contains(addr) {
            error!("free list: block {:#x} is already free", addr);
            return false;
        }
        self.blocks.push_back(addr);
        true
    }

    /// Take the oldest block
    pub fn pop_front(&mut self) -> Option<usize> {
        self.blocks.pop_front()
    }

    /// Remove `addr` wherever it sits in the list.
    /// Returns whether it was present.
    pub fn remove(&mut self, addr: usize) -> bool {
        match self.blocks.iter().position(|&a| a == addr) {
            Some(idx) => {
                self.blocks.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, addr: usize) -> bool {
        self.blocks.contains(&addr)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate in FIFO order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().copied()
    }

    /// Snapshot of the list sorted by address
    pub fn sorted(&self) -> Vec<usize> {
        let mut addrs: Vec<usize> = self.blocks.iter().copied().collect();
        addrs.sort_unstable();
        addrs
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}

//! Layout verification
//!
//! Checks that a set of free and allocated blocks is a valid buddy layout:
//! every block is an aligned size class inside the region, the blocks tile
//! the region exactly, and no two free buddies were left unmerged.

use alloc::vec::Vec;
use core::fmt;

use super::buddy_block::Block;
use crate::is_aligned;

/// A broken layout invariant, as reported by [`verify_layout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Block extends past the end of the region
    OutOfRange { addr: usize, size: usize },
    /// Block size is not one of the region's size classes
    InvalidSizeClass { addr: usize, size: usize },
    /// Block start is not a multiple of its size
    Misaligned { addr: usize, size: usize },
    /// Address is both allocated and sitting in a free list
    AllocatedAndFree { addr: usize },
    /// Block starting at `addr` overlaps the block before it
    Overlap { addr: usize },
    /// `[start, end)` is covered by no block
    Gap { start: usize, end: usize },
    /// Both a free block and its buddy are free at the same size
    Uncoalesced { addr: usize, size: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OutOfRange { addr, size } => {
                write!(f, "block [{:#x}, +{:#x}) exceeds the region", addr, size)
            }
            Self::InvalidSizeClass { addr, size } => {
                write!(f, "block at {:#x} has invalid size {:#x}", addr, size)
            }
            Self::Misaligned { addr, size } => {
                write!(f, "block at {:#x} is not aligned to {:#x}", addr, size)
            }
            Self::AllocatedAndFree { addr } => {
                write!(f, "block at {:#x} is both allocated and free", addr)
            }
            Self::Overlap { addr } => write!(f, "block at {:#x} overlaps its predecessor", addr),
            Self::Gap { start, end } => write!(f, "[{:#x}, {:#x}) is not covered", start, end),
            Self::Uncoalesced { addr, size } => {
                write!(f, "free block at {:#x} has a free buddy of size {:#x}", addr, size)
            }
        }
    }
}

impl core::error::Error for InvariantViolation {}

fn check_block(
    block: &Block,
    memory_size: usize,
    min_block_size: usize,
) -> Result<(), InvariantViolation> {
    let Block { addr, size } = *block;
    if size < min_block_size || size > memory_size || !size.is_power_of_two() {
        return Err(InvariantViolation::InvalidSizeClass { addr, size });
    }
    if addr >= memory_size || size > memory_size - addr {
        return Err(InvariantViolation::OutOfRange { addr, size });
    }
    if !is_aligned(addr, size) {
        return Err(InvariantViolation::Misaligned { addr, size });
    }
    Ok(())
}

/// Verify a region layout built from its free and allocated blocks.
pub fn verify_layout(
    memory_size: usize,
    min_block_size: usize,
    free: &[Block],
    allocated: &[Block],
) -> Result<(), InvariantViolation> {
    for block in free.iter().chain(allocated) {
        check_block(block, memory_size, min_block_size)?;
    }

    let mut free_sorted: Vec<Block> = free.to_vec();
    free_sorted.sort_unstable();

    for block in allocated {
        if free_sorted.iter().any(|f| f.addr == block.addr) {
            return Err(InvariantViolation::AllocatedAndFree { addr: block.addr });
        }
    }

    for block in &free_sorted {
        if block.size == memory_size {
            continue;
        }
        let buddy = Block::new(block.buddy_addr(), block.size);
        if free_sorted.binary_search(&buddy).is_ok() {
            return Err(InvariantViolation::Uncoalesced {
                addr: block.addr.min(buddy.addr),
                size: block.size,
            });
        }
    }

    let mut all: Vec<Block> = free_sorted;
    all.extend_from_slice(allocated);
    all.sort_unstable();

    let mut cursor = 0;
    for block in &all {
        if block.addr < cursor {
            return Err(InvariantViolation::Overlap { addr: block.addr });
        }
        if block.addr > cursor {
            return Err(InvariantViolation::Gap {
                start: cursor,
                end: block.addr,
            });
        }
        cursor = block.end();
    }
    if cursor < memory_size {
        return Err(InvariantViolation::Gap {
            start: cursor,
            end: memory_size,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_region_free() {
        assert_eq!(verify_layout(256, 32, &[Block::new(0, 256)], &[]), Ok(()));
    }

    #[test]
    fn test_split_layout() {
        let free = [Block::new(128, 128), Block::new(64, 64)];
        let allocated = [Block::new(0, 32), Block::new(32, 32)];
        assert_eq!(verify_layout(256, 32, &free, &allocated), Ok(()));
    }

    #[test]
    fn test_gap_detected() {
        let free = [Block::new(128, 128)];
        let allocated = [Block::new(0, 64)];
        assert_eq!(
            verify_layout(256, 32, &free, &allocated),
            Err(InvariantViolation::Gap { start: 64, end: 128 })
        );
        assert_eq!(
            verify_layout(256, 32, &[], &allocated),
            Err(InvariantViolation::Gap { start: 64, end: 256 })
        );
    }

    #[test]
    fn test_overlap_detected() {
        let free = [Block::new(128, 128)];
        let allocated = [Block::new(0, 128), Block::new(64, 64)];
        assert_eq!(
            verify_layout(256, 32, &free, &allocated),
            Err(InvariantViolation::Overlap { addr: 64 })
        );
    }

    #[test]
    fn test_misaligned_and_range() {
        assert_eq!(
            verify_layout(256, 32, &[Block::new(32, 64)], &[]),
            Err(InvariantViolation::Misaligned { addr: 32, size: 64 })
        );
        assert_eq!(
            verify_layout(256, 32, &[Block::new(256, 32)], &[]),
            Err(InvariantViolation::OutOfRange { addr: 256, size: 32 })
        );
        assert_eq!(
            verify_layout(256, 32, &[], &[Block::new(0, 16)]),
            Err(InvariantViolation::InvalidSizeClass { addr: 0, size: 16 })
        );
    }

    #[test]
    fn test_allocated_and_free() {
        let free = [Block::new(0, 32), Block::new(128, 128), Block::new(64, 64)];
        let allocated = [Block::new(0, 32)];
        assert_eq!(
            verify_layout(256, 32, &free, &allocated),
            Err(InvariantViolation::AllocatedAndFree { addr: 0 })
        );
    }

    #[test]
    fn test_uncoalesced_buddies() {
        let free = [Block::new(0, 128), Block::new(128, 128)];
        assert_eq!(
            verify_layout(256, 32, &free, &[]),
            Err(InvariantViolation::Uncoalesced { addr: 0, size: 128 })
        );
    }
}

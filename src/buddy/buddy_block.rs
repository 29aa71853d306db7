//! Buddy block metadata
//!
//! Represents a block of the managed region with address and size information.

/// Maximum number of size classes an allocator can have (one per bit of `usize`)
pub const MAX_SIZE_CLASSES: usize = usize::BITS as usize;

/// Buddy block: an aligned, power-of-two sized range `[addr, addr + size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block {
    pub addr: usize,
    pub size: usize,
}

impl Block {
    /// Create a new block
    pub const fn new(addr: usize, size: usize) -> Self {
        Self { addr, size }
    }

    /// One past the last offset covered by this block
    pub const fn end(&self) -> usize {
        self.addr + self.size
    }

    /// Calculate the buddy address for this block
    /// The buddy is the other half of the parent block one size class up.
    /// For a block of size S at address A, its buddy is at A ^ S
    pub const fn buddy_addr(&self) -> usize {
        self.addr ^ self.size
    }

    /// Whether `addr` falls inside this block
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.addr && addr < self.end()
    }

    /// Whether the two blocks share at least one offset
    pub const fn overlaps(&self, other: &Block) -> bool {
        self.addr < other.end() && other.addr < self.end()
    }
}

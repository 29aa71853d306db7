//! Buddy Region Allocator
//!
//! This crate implements a buddy-system allocator over a fixed, power-of-two
//! sized range of offsets `[0, memory_size)`, featuring:
//! - Power-of-two size classes between `min_block_size` and `memory_size`
//! - Block splitting on allocation and iterative buddy coalescing on free
//! - Double-free detection and invariant verification
//! - A spinlock-protected wrapper for shared use
//!
//! The allocator does not touch real memory. It hands out offsets, and the
//! caller decides what those offsets refer to.

#![no_std]

extern crate alloc;

use core::fmt;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuddyError {
    /// Bad constructor arguments: `memory_size` is zero or not a power of
    /// two, or `limit_divisions` leaves a minimum block smaller than one unit.
    InvalidConfig,
    /// A zero-sized allocation was requested.
    InvalidSize,
    /// The rounded request is larger than the whole managed region.
    Unsatisfiable,
    /// No free block is large enough to satisfy the request right now.
    OutOfMemory,
    /// Free of an address that is not the start of a live allocation.
    InvalidFree,
}

impl fmt::Display for BuddyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            BuddyError::InvalidConfig => "invalid allocator configuration",
            BuddyError::InvalidSize => "allocation size must be greater than zero",
            BuddyError::Unsatisfiable => "allocation size exceeds the managed region",
            BuddyError::OutOfMemory => "no free block large enough",
            BuddyError::InvalidFree => "address is not allocated",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for BuddyError {}

/// A [`Result`] type with [`BuddyError`] as the error type.
pub type BuddyResult<T = ()> = Result<T, BuddyError>;

/// Offset-granularity region allocator.
pub trait RegionAllocator {
    /// Reserve a block of at least `size` units.
    fn alloc(&mut self, size: usize) -> BuddyResult<Block>;

    /// Release the block starting at `addr`.
    fn free(&mut self, addr: usize) -> BuddyResult;

    /// Returns the size of the managed region.
    fn total_bytes(&self) -> usize;

    /// Returns the number of units held by live allocations.
    fn used_bytes(&self) -> usize;

    /// Returns the number of units sitting in free lists.
    fn available_bytes(&self) -> usize;
}

/// Checks whether the address has the demanded alignment.
///
/// Equivalent to `addr % align == 0`, but the alignment must be a power of two.
#[inline]
pub(crate) const fn is_aligned(addr: usize, align: usize) -> bool {
    addr & (align - 1) == 0
}

pub mod buddy;
pub use buddy::{
    BuddyAllocator, BuddyStats, Block, FreeListDump, InvariantViolation, MemoryStatsReporter,
    MAX_SIZE_CLASSES,
};

pub mod locked_allocator;
pub use locked_allocator::LockedBuddyAllocator;

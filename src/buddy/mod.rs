//! Buddy allocator module
//!
//! This module provides a complete buddy system implementation with:
//! - FIFO free lists, one per size class
//! - An allocated-block table for double-free detection
//! - Statistics and invariant verification

pub mod buddy_allocator;
pub mod buddy_block;
pub mod buddy_set;
pub mod free_list;
pub mod stats;
pub mod verify;

pub use buddy_allocator::{BuddyAllocator, FreeListDump};
pub use buddy_block::{Block, MAX_SIZE_CLASSES};
pub use buddy_set::BuddySet;
pub use free_list::FreeList;
pub use stats::{BuddyStats, MemoryStatsReporter};
pub use verify::InvariantViolation;

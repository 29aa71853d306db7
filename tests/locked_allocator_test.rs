//! Tests for LockedBuddyAllocator shared between threads

use std::sync::Arc;
use std::thread;

use buddy_region_allocator::{BuddyError, LockedBuddyAllocator};

const THREADS: usize = 4;

#[test]
fn test_concurrent_alloc_free() {
    let allocator = Arc::new(LockedBuddyAllocator::new(1 << 20, 12).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                let mut held = Vec::new();
                for i in 0..500 {
                    let size = 256 << ((t + i) % 5);
                    match allocator.alloc(size) {
                        Ok(block) => held.push(block),
                        Err(err) => assert_eq!(err, BuddyError::OutOfMemory),
                    }
                    if i % 3 == 0 {
                        if let Some(block) = held.pop() {
                            allocator.free(block.addr).unwrap();
                        }
                    }
                }
                held
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    // No two threads were handed overlapping blocks
    all.sort();
    for pair in all.windows(2) {
        assert!(pair[0].end() <= pair[1].addr);
    }
    assert_eq!(allocator.verify(), Ok(()));
    assert_eq!(allocator.stats().allocated_blocks, all.len());

    for block in all {
        allocator.free(block.addr).unwrap();
    }
    let lists = allocator.dump_free_lists();
    assert_eq!(lists[0], (1 << 20, vec![0]));
    assert!(allocator.dump_allocated().is_empty());
}

#[test]
fn test_concurrent_double_free_single_winner() {
    let allocator = Arc::new(LockedBuddyAllocator::new(4096, 4).unwrap());
    let block = allocator.alloc(256).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || allocator.free(block.addr))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| *r == Err(BuddyError::InvalidFree)));
    assert_eq!(allocator.verify(), Ok(()));
}

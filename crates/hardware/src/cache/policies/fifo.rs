//! First-In, First-Out (FIFO) Replacement Policy.
//!
//! This policy evicts the oldest line in a set, regardless of how recently
//! it was accessed. Each set keeps an insertion-order queue of its ways; a
//! fill pushes the way as the newest entry and hits leave the queue alone.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `insert()`: O(W) where W is the number of ways
//!   - `update()`: O(1)
//!   - `next()`: O(1)
//! - **Space Complexity:** O(S × W) where S is the number of sets
//! - **Best Case:** Streaming accesses where all lines have equal importance
//! - **Worst Case:** Workloads with strong temporal locality (may evict frequently-used lines)

use super::{EvictionPolicy, WayStacks};
use crate::common::addr::LineAddr;

/// FIFO Policy state.
#[derive(Debug, Clone)]
pub struct FifoPolicy {
    /// Insertion queues, one per set. Index 0 is the newest fill, last index the oldest.
    queue: WayStacks,
}

impl FifoPolicy {
    /// Creates a new FIFO policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity (number of ways) of the cache.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            queue: WayStacks::new(sets, ways),
        }
    }

    /// Ways of `set` from newest to oldest fill.
    pub fn order(&self, set: usize) -> &[usize] {
        self.queue.order(set)
    }
}

impl EvictionPolicy for FifoPolicy {
    /// Returns the oldest-inserted way of the set.
    fn next(&mut self, set: usize) -> usize {
        self.queue.bottom(set)
    }

    fn insert(&mut self, set: usize, way: usize) {
        self.queue.promote(set, way);
    }

    /// FIFO ignores hits.
    fn update(&mut self, _addr: &LineAddr, _way: usize) {}
}

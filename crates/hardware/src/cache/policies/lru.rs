//! Least Recently Used (LRU) Replacement Policy.
//!
//! This policy evicts the cache line that has not been accessed for the longest time.
//! It maintains a usage stack for each set. Both a fill and a hit move the way
//! to the top (Most Recently Used position). The bottom of the stack represents
//! the Least Recently Used line.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `insert()` / `update()`: O(W) where W is the number of ways (associativity)
//!   - `next()`: O(1)
//! - **Space Complexity:** O(S × W) where S is the number of sets
//! - **Best Case:** Working sets that fit in the cache with good temporal locality
//! - **Worst Case:** Cyclic scans larger than the cache (thrashing)

use super::{EvictionPolicy, WayStacks};
use crate::common::addr::LineAddr;

/// LRU Policy state.
#[derive(Debug, Clone)]
pub struct LruPolicy {
    /// Usage stacks, one per set. Index 0 is MRU, last index is LRU.
    usage: WayStacks,
}

impl LruPolicy {
    /// Creates a new LRU policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity (number of ways) of the cache.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: WayStacks::new(sets, ways),
        }
    }

    /// Ways of `set` from MRU to LRU.
    pub fn order(&self, set: usize) -> &[usize] {
        self.usage.order(set)
    }
}

impl EvictionPolicy for LruPolicy {
    /// Returns the way at the bottom of the usage stack (LRU position).
    fn next(&mut self, set: usize) -> usize {
        self.usage.bottom(set)
    }

    /// A newly filled line becomes the MRU line.
    fn insert(&mut self, set: usize, way: usize) {
        self.usage.promote(set, way);
    }

    /// Moves the hit way to the MRU position, shifting the others down.
    fn update(&mut self, addr: &LineAddr, way: usize) {
        self.usage.promote(addr.set, way);
    }
}

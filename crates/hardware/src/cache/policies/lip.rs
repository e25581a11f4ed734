//! LRU Insertion Policy (LIP).
//!
//! Hits promote a line to MRU exactly as in LRU, but a newly filled line is
//! placed at the LRU position. A line therefore has to be reused once before
//! it is protected, which keeps a scan larger than the cache from flushing a
//! working set that fits.
//!
//! No special treatment is given to invalid ways: in a cold set the freshly
//! filled way stays the next victim until something in the set is hit.

use super::{EvictionPolicy, WayStacks};
use crate::common::addr::LineAddr;

/// LIP Policy state.
#[derive(Debug, Clone)]
pub struct LipPolicy {
    /// Usage stacks, one per set. Index 0 is MRU, last index is LRU.
    usage: WayStacks,
}

impl LipPolicy {
    /// Creates a new LIP policy instance.
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

impl EvictionPolicy for LipPolicy {
    fn next(&mut self, set: usize) -> usize {
        self.usage.bottom(set)
    }

    /// New lines enter at the LRU position.
    fn insert(&mut self, set: usize, way: usize) {
        self.usage.demote(set, way);
    }

    fn update(&mut self, addr: &LineAddr, way: usize) {
        self.usage.promote(addr.set, way);
    }
}

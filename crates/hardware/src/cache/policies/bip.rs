//! Bimodal Insertion Policy (BIP).
//!
//! BIP behaves like LIP, except that one fill in [`BIP_THROTTLE`] (drawn from
//! an LFSR) is inserted at the MRU position instead of the LRU position. This
//! lets part of a changing working set settle in the cache while still
//! resisting thrashing.

use super::{EvictionPolicy, Lfsr, WayStacks};
use crate::common::addr::LineAddr;
use crate::common::constants::BIP_THROTTLE;

/// BIP Policy state.
#[derive(Debug, Clone)]
pub struct BipPolicy {
    /// Usage stacks, one per set. Index 0 is MRU, last index is LRU.
    usage: WayStacks,
    /// Source of the MRU-insertion coin flips.
    lfsr: Lfsr,
}

impl BipPolicy {
    /// Creates a new BIP policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity (number of ways) of the cache.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: WayStacks::new(sets, ways),
            lfsr: Lfsr::new(),
        }
    }

    /// Ways of `set` from MRU to LRU.
    pub fn order(&self, set: usize) -> &[usize] {
        self.usage.order(set)
    }
}

impl EvictionPolicy for BipPolicy {
    fn next(&mut self, set: usize) -> usize {
        self.usage.bottom(set)
    }

    fn insert(&mut self, set: usize, way: usize) {
        if self.lfsr.step() % BIP_THROTTLE == 0 {
            self.usage.promote(set, way);
        } else {
            self.usage.demote(set, way);
        }
    }

    fn update(&mut self, addr: &LineAddr, way: usize) {
        self.usage.promote(addr.set, way);
    }
}

//! Cache Eviction Policies.
//!
//! Implements the algorithms that pick a victim way when a set must make room
//! for a new line. Each policy sees three notifications from its cache:
//! `next` (pick a victim), `insert` (the chosen way was just filled) and
//! `update` (a hit on a way).
//!
//! # Policies
//!
//! - `RandomPolicy`: LFSR-driven pseudo-random selection (`lfsr`).
//! - `LruPolicy`: Least Recently Used (`lru`).
//! - `FifoPolicy`: First-In, First-Out (`fifo`).
//! - `LipPolicy`: LRU Insertion Policy (`lip`).
//! - `BipPolicy`: Bimodal Insertion Policy (`bip`).

/// Bimodal Insertion Policy.
pub mod bip;

/// First-In, First-Out replacement policy.
pub mod fifo;

/// LRU Insertion Policy.
pub mod lip;

/// Least Recently Used replacement policy.
pub mod lru;

/// Random (LFSR) replacement policy.
pub mod random;

pub use bip::BipPolicy;
pub use fifo::FifoPolicy;
pub use lip::LipPolicy;
pub use lru::LruPolicy;
pub use random::{Lfsr, RandomPolicy};

use crate::common::addr::LineAddr;
use crate::config::ReplacementPolicy;

/// Trait for cache eviction policies.
///
/// Way indices passed in and returned are always in `0..ways` for the
/// geometry the policy was built with.
pub trait EvictionPolicy {
    /// Selects the way to evict from `set`.
    ///
    /// # Returns
    ///
    /// A way index in `0..ways`.
    fn next(&mut self, set: usize) -> usize;

    /// Records that `way` of `set` was just filled with a new line.
    ///
    /// Called exactly once per victimization, right after `next` chose `way`.
    fn insert(&mut self, set: usize, way: usize);

    /// Records a hit on `way` of the set `addr` maps to.
    fn update(&mut self, addr: &LineAddr, way: usize);
}

/// The eviction policy owned by a cache, selected once at construction.
#[derive(Debug, Clone)]
pub enum Policy {
    /// Pseudo-random replacement.
    Random(RandomPolicy),
    /// Least Recently Used.
    Lru(LruPolicy),
    /// First-In, First-Out.
    Fifo(FifoPolicy),
    /// LRU Insertion Policy.
    Lip(LipPolicy),
    /// Bimodal Insertion Policy.
    Bip(BipPolicy),
}

impl Policy {
    /// Builds the policy named by `kind` for a `sets` × `ways` cache.
    pub fn new(kind: ReplacementPolicy, sets: usize, ways: usize) -> Self {
        match kind {
            ReplacementPolicy::Lfsr => Self::Random(RandomPolicy::new(sets, ways)),
            ReplacementPolicy::Lru => Self::Lru(LruPolicy::new(sets, ways)),
            ReplacementPolicy::Fifo => Self::Fifo(FifoPolicy::new(sets, ways)),
            ReplacementPolicy::Lip => Self::Lip(LipPolicy::new(sets, ways)),
            ReplacementPolicy::Bip => Self::Bip(BipPolicy::new(sets, ways)),
        }
    }

    /// Returns the configuration token this policy was built from.
    pub const fn kind(&self) -> ReplacementPolicy {
        match self {
            Self::Random(_) => ReplacementPolicy::Lfsr,
            Self::Lru(_) => ReplacementPolicy::Lru,
            Self::Fifo(_) => ReplacementPolicy::Fifo,
            Self::Lip(_) => ReplacementPolicy::Lip,
            Self::Bip(_) => ReplacementPolicy::Bip,
        }
    }
}

impl EvictionPolicy for Policy {
    #[inline]
    fn next(&mut self, set: usize) -> usize {
        match self {
            Self::Random(p) => p.next(set),
            Self::Lru(p) => p.next(set),
            Self::Fifo(p) => p.next(set),
            Self::Lip(p) => p.next(set),
            Self::Bip(p) => p.next(set),
        }
    }

    #[inline]
    fn insert(&mut self, set: usize, way: usize) {
        match self {
            Self::Random(p) => p.insert(set, way),
            Self::Lru(p) => p.insert(set, way),
            Self::Fifo(p) => p.insert(set, way),
            Self::Lip(p) => p.insert(set, way),
            Self::Bip(p) => p.insert(set, way),
        }
    }

    #[inline]
    fn update(&mut self, addr: &LineAddr, way: usize) {
        match self {
            Self::Random(p) => p.update(addr, way),
            Self::Lru(p) => p.update(addr, way),
            Self::Fifo(p) => p.update(addr, way),
            Self::Lip(p) => p.update(addr, way),
            Self::Bip(p) => p.update(addr, way),
        }
    }
}

/// Per-set ordering of ways shared by the stack-based policies.
///
/// Index 0 is the most recent (MRU or newest) position, the last index is
/// the eviction position. A fresh stack evicts way 0 first, then way 1, and
/// so on.
#[derive(Debug, Clone)]
pub(crate) struct WayStacks {
    stacks: Vec<Vec<usize>>,
}

impl WayStacks {
    pub(crate) fn new(sets: usize, ways: usize) -> Self {
        Self {
            stacks: (0..sets).map(|_| (0..ways).rev().collect()).collect(),
        }
    }

    /// Way at the eviction end of `set`.
    pub(crate) fn bottom(&self, set: usize) -> usize {
        self.stacks[set].last().copied().unwrap_or(0)
    }

    /// Moves `way` to the most recent end of `set`.
    pub(crate) fn promote(&mut self, set: usize, way: usize) {
        let stack = &mut self.stacks[set];
        if let Some(pos) = stack.iter().position(|&w| w == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }

    /// Moves `way` to the eviction end of `set`.
    pub(crate) fn demote(&mut self, set: usize, way: usize) {
        let stack = &mut self.stacks[set];
        if let Some(pos) = stack.iter().position(|&w| w == way) {
            let _ = stack.remove(pos);
        }
        stack.push(way);
    }

    /// Ways of `set` from most recent to eviction end.
    pub(crate) fn order(&self, set: usize) -> &[usize] {
        &self.stacks[set]
    }
}

//! Random Replacement Policy.
//!
//! This policy evicts a pseudo-random line from the set. It uses a 32-bit
//! Galois Linear Feedback Shift Register (LFSR) to generate pseudo-random
//! numbers, so runs are reproducible and no RNG state leaks between caches.

use super::EvictionPolicy;
use crate::common::addr::LineAddr;
use crate::common::constants::{LFSR_SEED, LFSR_TAPS};

/// 32-bit Galois LFSR.
///
/// Also the pseudo-random source of [`BipPolicy`](super::BipPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lfsr {
    reg: u32,
}

impl Lfsr {
    /// Creates a register holding [`LFSR_SEED`].
    pub const fn new() -> Self {
        Self { reg: LFSR_SEED }
    }

    /// Shifts the register once and returns its new value.
    #[inline]
    pub const fn step(&mut self) -> u32 {
        self.reg = (self.reg >> 1) ^ ((self.reg & 1).wrapping_neg() & LFSR_TAPS);
        self.reg
    }
}

impl Default for Lfsr {
    fn default() -> Self {
        Self::new()
    }
}

/// Random Policy state.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    /// Number of ways in the cache.
    ways: usize,
    /// One generator for the whole cache, shared by every set.
    lfsr: Lfsr,
}

impl RandomPolicy {
    /// Creates a new Random policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets (unused in this policy but required by interface).
    /// * `ways` - The associativity (number of ways) of the cache.
    pub const fn new(_sets: usize, ways: usize) -> Self {
        Self {
            ways,
            lfsr: Lfsr::new(),
        }
    }
}

impl EvictionPolicy for RandomPolicy {
    /// Advances the LFSR and maps its output to a valid way index.
    fn next(&mut self, _set: usize) -> usize {
        self.lfsr.step() as usize % self.ways
    }

    fn insert(&mut self, _set: usize, _way: usize) {}

    fn update(&mut self, _addr: &LineAddr, _way: usize) {}
}

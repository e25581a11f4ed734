//! Global Simulator Constants.
//!
//! This module defines constants shared by the configuration layer and the
//! eviction policies. It includes:
//! 1. **Geometry Limits:** The smallest supported line size.
//! 2. **Pseudo-Random Source:** Seed and feedback taps of the policy LFSR.
//! 3. **Insertion Throttle:** How often BIP inserts at the MRU position.

/// Smallest supported cache line size in bytes.
pub const MIN_LINE_BYTES: u64 = 8;

/// Initial state of the 32-bit Galois LFSR used by random replacement and BIP.
///
/// Must be nonzero; an all-zero register never leaves zero.
pub const LFSR_SEED: u32 = 1;

/// Feedback taps of the 32-bit Galois LFSR (x^32 + x^31 + x^29 + x + 1).
pub const LFSR_TAPS: u32 = 0xD0000001;

/// BIP inserts a new line at the MRU position once every this many fills, on average.
pub const BIP_THROTTLE: u32 = 32;

/// Size in bytes of a trace record that does not state one.
pub const DEFAULT_ACCESS_BYTES: u64 = 8;

//! Functional cache hierarchy simulator library.
//!
//! This crate models which memory lines a set-associative cache holds, without
//! timing, for use beside an instruction-set simulator:
//! 1. **Addresses:** Bit-level decomposition of byte addresses into tag and set index.
//! 2. **Policies:** Pluggable eviction (LFSR random, LRU, FIFO, LIP, BIP).
//! 3. **Caches:** Hit/miss handling, dirty write-back, clean and invalidate of ranges.
//! 4. **Hierarchy:** Levels chained toward memory, with I$/D$ ports for a core.
//! 5. **Statistics:** Per-cache access, miss, write-back and clean counters.

/// Cache level and eviction policies.
pub mod cache;
/// Common types and constants (line addresses, access types, errors).
pub mod common;
/// Cache configuration (geometry, policy tokens, hierarchy layout).
pub mod config;
/// Multi-level hierarchy of caches linked toward memory.
pub mod hierarchy;
/// Event counters and reporting.
pub mod stats;

/// A single cache level; build with `CacheSim::new` or `CacheSim::from_config_str`.
pub use crate::cache::CacheSim;
/// Geometry and policy of one cache.
pub use crate::config::CacheConfig;
/// Owner of a chain of caches; build with `CacheHierarchy::from_config`.
pub use crate::hierarchy::CacheHierarchy;

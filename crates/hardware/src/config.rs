//! Configuration system for the cache simulator.
//!
//! This module defines the structures used to parameterize caches. It provides:
//! 1. **Policies:** The eviction policy tokens (`lfsr`, `lru`, `fifo`, `lip`, `bip`).
//! 2. **Geometry:** `CacheConfig`, parsed from `sets:ways:linesize[:policy]` strings.
//! 3. **Hierarchy:** `HierarchyConfig`, the optional I$, D$ and L2$ of a core.
//!
//! Configuration is supplied as command-line strings or JSON. Geometry is
//! validated before any cache state is allocated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::constants::MIN_LINE_BYTES;
use crate::common::error::ConfigError;

/// Usage text describing the cache configuration string.
pub const CONFIG_USAGE: &str = "\
Cache configurations must be of the form
  sets:ways:blocksize:policy
where sets, ways, and blocksize are positive integers, with
sets and blocksize both powers of two and blocksize at least 8.
Finally, policy is a string. Either 'lfsr', 'lru', 'fifo', 'lip', or 'bip'.
The policy may be omitted, in which case 'lfsr' is used.";

/// Cache eviction policy algorithms.
///
/// Specifies the algorithm used to select which line to evict when a new
/// line must be installed in a full set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementPolicy {
    /// Pseudo-random victim selection driven by an LFSR.
    #[default]
    Lfsr,
    /// Least Recently Used.
    Lru,
    /// First In First Out; hits do not refresh a line.
    Fifo,
    /// LRU Insertion Policy: LRU promotion, new lines enter at the LRU position.
    Lip,
    /// Bimodal Insertion Policy: like LIP, but occasionally inserts at MRU.
    Bip,
}

impl ReplacementPolicy {
    /// Every policy, in token order.
    pub const ALL: [Self; 5] = [Self::Lfsr, Self::Lru, Self::Fifo, Self::Lip, Self::Bip];

    /// Returns the configuration token for this policy.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Lfsr => "lfsr",
            Self::Lru => "lru",
            Self::Fifo => "fifo",
            Self::Lip => "lip",
            Self::Bip => "bip",
        }
    }
}

impl FromStr for ReplacementPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.token() == s)
            .ok_or_else(|| ConfigError::UnknownPolicy(s.to_string()))
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Geometry and eviction policy of a single cache.
///
/// # Examples
///
/// ```
/// use cachesim_core::config::{CacheConfig, ReplacementPolicy};
///
/// let config: CacheConfig = "64:8:64:lru".parse().unwrap();
/// assert_eq!(config.sets, 64);
/// assert_eq!(config.ways, 8);
/// assert_eq!(config.policy, ReplacementPolicy::Lru);
/// assert_eq!(config.size_bytes(), 32 * 1024);
///
/// // The policy defaults to the LFSR.
/// let config: CacheConfig = "256:4:32".parse().unwrap();
/// assert_eq!(config.policy, ReplacementPolicy::Lfsr);
///
/// assert!("100:4:64".parse::<CacheConfig>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Number of sets; a nonzero power of two.
    pub sets: u64,
    /// Associativity; at least one.
    pub ways: usize,
    /// Line size in bytes; a power of two of at least 8.
    pub line_bytes: u64,
    /// Eviction policy.
    #[serde(default)]
    pub policy: ReplacementPolicy,
}

impl CacheConfig {
    /// Builds a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first geometry constraint that `sets`, `ways` or
    /// `line_bytes` violates.
    pub fn new(
        sets: u64,
        ways: usize,
        line_bytes: u64,
        policy: ReplacementPolicy,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            sets,
            ways,
            line_bytes,
            policy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the geometry invariants that address decomposition relies on.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::SetsNotPowerOfTwo`] if `sets` is zero or not a power of two.
    /// * [`ConfigError::InvalidLineSize`] if `line_bytes` is below 8 or not a power of two.
    /// * [`ConfigError::ZeroWays`] if `ways` is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if !self.sets.is_power_of_two() {
            return Err(ConfigError::SetsNotPowerOfTwo(self.sets));
        }
        if self.line_bytes < MIN_LINE_BYTES || !self.line_bytes.is_power_of_two() {
            return Err(ConfigError::InvalidLineSize(self.line_bytes));
        }
        if self.ways == 0 {
            return Err(ConfigError::ZeroWays);
        }
        Ok(())
    }

    /// Total capacity in bytes, saturating on absurd geometries.
    pub const fn size_bytes(&self) -> u64 {
        self.sets
            .saturating_mul(self.ways as u64)
            .saturating_mul(self.line_bytes)
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

impl FromStr for CacheConfig {
    type Err = ConfigError;

    /// Parses `sets:ways:linesize[:policy]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        let (sets, ways, line_bytes, policy) = match fields.as_slice() {
            [sets, ways, line] => (sets, ways, line, ReplacementPolicy::default()),
            [sets, ways, line, policy] => (sets, ways, line, policy.parse()?),
            _ => return Err(ConfigError::Malformed(s.to_string())),
        };
        Self::new(
            parse_field("sets", sets)?,
            parse_field("ways", ways)?,
            parse_field("linesize", line_bytes)?,
            policy,
        )
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.sets, self.ways, self.line_bytes, self.policy
        )
    }
}

/// Cache hierarchy of one core.
///
/// Each level is optional. When an L2 is present, both L1 caches forward
/// their misses and write-backs to it.
///
/// ```
/// use cachesim_core::config::{HierarchyConfig, ReplacementPolicy};
///
/// let json = r#"{
///     "l1_d": { "sets": 64, "ways": 8, "line_bytes": 64, "policy": "lru" },
///     "l2": { "sets": 512, "ways": 16, "line_bytes": 64 }
/// }"#;
///
/// let config: HierarchyConfig = serde_json::from_str(json).unwrap();
/// assert!(config.l1_i.is_none());
/// assert_eq!(config.l1_d.unwrap().policy, ReplacementPolicy::Lru);
/// assert_eq!(config.l2.unwrap().policy, ReplacementPolicy::Lfsr);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// L1 instruction cache.
    pub l1_i: Option<CacheConfig>,
    /// L1 data cache.
    pub l1_d: Option<CacheConfig>,
    /// Unified L2 cache.
    pub l2: Option<CacheConfig>,
}

impl HierarchyConfig {
    /// Validates every configured level.
    ///
    /// # Errors
    ///
    /// Returns the first invalid level's error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        [self.l1_i, self.l1_d, self.l2]
            .iter()
            .flatten()
            .try_for_each(CacheConfig::validate)
    }
}

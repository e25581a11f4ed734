//! Configuration error definitions.
//!
//! Every failure the simulator can report happens while a cache or a
//! hierarchy is being configured. Once built, `access` and `clean_invalidate`
//! accept any address and size, so there is no runtime error type.

use thiserror::Error;

use crate::hierarchy::LevelId;

/// Reasons a cache configuration is rejected.
///
/// Returned before any tag storage is allocated, so no partially built
/// cache is ever observable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration string is not `sets:ways:linesize[:policy]`.
    #[error("malformed cache configuration '{0}'")]
    Malformed(String),

    /// A numeric field did not parse as an unsigned integer.
    #[error("invalid {field} '{value}' in cache configuration")]
    InvalidNumber {
        /// Which field failed (`sets`, `ways` or `linesize`).
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The set count is zero or not a power of two.
    #[error("number of sets must be a nonzero power of two, got {0}")]
    SetsNotPowerOfTwo(u64),

    /// The line size is below 8 bytes or not a power of two.
    #[error("line size must be a power of two of at least 8 bytes, got {0}")]
    InvalidLineSize(u64),

    /// The associativity is zero.
    #[error("a cache needs at least one way")]
    ZeroWays,

    /// The eviction policy token is not recognized.
    #[error("unknown eviction policy '{0}'")]
    UnknownPolicy(String),

    /// A level id does not belong to the hierarchy.
    #[error("no cache level {0} in this hierarchy")]
    UnknownLevel(LevelId),

    /// A level tried to forward to a level that was not built before it.
    #[error("level {level} cannot forward misses to level {next}, which was not built before it")]
    MissHandlerOrder {
        /// The level being linked.
        level: LevelId,
        /// The requested next level.
        next: LevelId,
    },
}

//! Common utilities and types used throughout the cache simulator.
//!
//! This module provides the building blocks shared by every cache level. It includes:
//! 1. **Address Types:** Decomposition of byte addresses into tag and set index.
//! 2. **Constants:** Geometry limits and pseudo-random source parameters.
//! 3. **Memory Access:** Classification of accesses (Fetch/Read/Write).
//! 4. **Error Handling:** Configuration errors.

/// Cache-line address decomposition.
pub mod addr;

/// Common constants used throughout the simulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Configuration error types.
pub mod error;

pub use addr::LineAddr;
pub use constants::{BIP_THROTTLE, MIN_LINE_BYTES};
pub use data::AccessType;
pub use error::ConfigError;

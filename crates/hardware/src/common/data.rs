//! Memory Access Types.
//!
//! This module defines the classification of memory accesses observed by the
//! cache hierarchy. These types are used for the following:
//! 1. **Port Routing:** Sending instruction fetches to the I-cache and data accesses to the D-cache.
//! 2. **Store Detection:** Deciding whether an access dirties the line it touches.

/// Type of memory access operation.
///
/// Distinguishes instruction fetches, data loads, and data stores so a
/// hierarchy can route each to the right first-level cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Instruction fetch access.
    ///
    /// Routed to the instruction cache and always modeled as a read.
    Fetch,

    /// Data read access.
    ///
    /// Routed to the data cache.
    Read,

    /// Data write access.
    ///
    /// Routed to the data cache; marks the touched line dirty.
    Write,
}

impl AccessType {
    /// Returns `true` for accesses that modify memory.
    #[inline]
    pub const fn is_store(self) -> bool {
        matches!(self, Self::Write)
    }
}

//! Cache statistics collection and reporting.
//!
//! This module tracks the events a cache reports while it runs. It provides:
//! 1. **Event sink:** The `CounterSink` trait every cache pushes its events into.
//! 2. **Counters:** `CacheStats`, the default sink (accesses, bytes, misses, write-backs, cleans).
//! 3. **Reporting:** A per-cache text report and a serializable form for JSON output.

use std::fmt;

use serde::Serialize;

/// Receiver of cache events.
///
/// A cache calls `on_access` once per access, `on_miss` once per miss,
/// `on_writeback` once per dirty line written back (evicted or cleaned) and
/// `on_clean` once per line cleaned by a clean/invalidate request.
pub trait CounterSink {
    /// An access of `bytes` bytes reached the cache.
    fn on_access(&mut self, store: bool, bytes: u64);

    /// The access missed.
    fn on_miss(&mut self, store: bool);

    /// A dirty line was written back to the next level.
    fn on_writeback(&mut self);

    /// A dirty line was cleaned by an explicit request.
    fn on_clean(&mut self);
}

/// Per-cache event counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of load and fetch accesses.
    pub read_accesses: u64,
    /// Number of store accesses.
    pub write_accesses: u64,
    /// Bytes requested by loads and fetches.
    pub bytes_read: u64,
    /// Bytes requested by stores.
    pub bytes_written: u64,
    /// Loads and fetches that missed.
    pub read_misses: u64,
    /// Stores that missed.
    pub write_misses: u64,
    /// Dirty lines written back, by eviction or by a clean.
    pub writebacks: u64,
    /// Dirty lines cleaned by clean/invalidate requests.
    pub cleans: u64,
}

impl CacheStats {
    /// Total accesses.
    pub const fn accesses(&self) -> u64 {
        self.read_accesses + self.write_accesses
    }

    /// Total misses.
    pub const fn misses(&self) -> u64 {
        self.read_misses + self.write_misses
    }

    /// Miss rate as a percentage; zero when the cache saw no accesses.
    pub fn miss_rate(&self) -> f64 {
        let accesses = self.accesses();
        if accesses == 0 {
            0.0
        } else {
            100.0 * self.misses() as f64 / accesses as f64
        }
    }

    /// Returns a displayable report of these counters labelled with `name`.
    ///
    /// The report is empty when the cache saw no accesses.
    pub const fn report<'a>(&'a self, name: &'a str) -> StatsReport<'a> {
        StatsReport { name, stats: self }
    }
}

impl CounterSink for CacheStats {
    fn on_access(&mut self, store: bool, bytes: u64) {
        if store {
            self.write_accesses += 1;
            self.bytes_written = self.bytes_written.saturating_add(bytes);
        } else {
            self.read_accesses += 1;
            self.bytes_read = self.bytes_read.saturating_add(bytes);
        }
    }

    fn on_miss(&mut self, store: bool) {
        if store {
            self.write_misses += 1;
        } else {
            self.read_misses += 1;
        }
    }

    fn on_writeback(&mut self) {
        self.writebacks += 1;
    }

    fn on_clean(&mut self) {
        self.cleans += 1;
    }
}

/// Text report of one cache's counters.
#[derive(Debug, Clone, Copy)]
pub struct StatsReport<'a> {
    name: &'a str,
    stats: &'a CacheStats,
}

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.stats;
        if s.accesses() == 0 {
            return Ok(());
        }
        let name = self.name;
        writeln!(f, "{name} Bytes Read:            {}", s.bytes_read)?;
        writeln!(f, "{name} Bytes Written:         {}", s.bytes_written)?;
        writeln!(f, "{name} Read Accesses:         {}", s.read_accesses)?;
        writeln!(f, "{name} Write Accesses:        {}", s.write_accesses)?;
        writeln!(f, "{name} Read Misses:           {}", s.read_misses)?;
        writeln!(f, "{name} Write Misses:          {}", s.write_misses)?;
        writeln!(f, "{name} Writebacks:            {}", s.writebacks)?;
        writeln!(f, "{name} Miss Rate:             {:.3}%", s.miss_rate())
    }
}

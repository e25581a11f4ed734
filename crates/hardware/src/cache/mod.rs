//! Set-Associative Cache Simulator.
//!
//! This module implements a functional (non-timing) set-associative cache.
//! Each cache tracks which lines are resident and dirty, picks victims through
//! a pluggable eviction policy, and forwards fills and write-backs to an
//! optional next level through the [`MissHandler`] trait.
//!
//! Fills are always modeled as reads of the next level, and only dirty
//! evictions are modeled as writes. A store that misses fetches the line
//! first and then dirties it in this level.

/// Cache eviction policy implementations (LFSR, LRU, FIFO, LIP, BIP).
pub mod policies;

use tracing::{debug, info, trace};

use self::policies::{EvictionPolicy, Policy};
use crate::common::addr::LineAddr;
use crate::common::error::ConfigError;
use crate::config::CacheConfig;
use crate::stats::{CacheStats, CounterSink};

/// Tracing target of the `"<name> <read|write> miss 0x<hex>"` lines emitted at
/// `info` level by caches with [`CacheSim::set_log`] enabled.
pub const MISS_LOG_TARGET: &str = "cachesim::miss";

/// The next level toward memory.
///
/// Implemented by [`CacheSim`] (acting as the last level of a chain) and by
/// the hierarchy's internal level cursor.
pub trait MissHandler {
    /// Performs an access of `bytes` bytes at `addr`.
    fn access(&mut self, addr: u64, bytes: u64, store: bool);

    /// Cleans and/or invalidates every line overlapping `[addr, addr + bytes)`.
    fn clean_invalidate(&mut self, addr: u64, bytes: u64, clean: bool, invalidate: bool);
}

/// A single set-associative cache level.
///
/// The tag array holds `sets × ways` entries laid out set by set. Events are
/// pushed into the counter sink `S`, which defaults to [`CacheStats`].
#[derive(Debug)]
pub struct CacheSim<S: CounterSink = CacheStats> {
    config: CacheConfig,
    name: String,
    lines: Vec<LineAddr>,
    policy: Policy,
    stats: S,
    log: bool,
}

impl CacheSim<CacheStats> {
    /// Creates a cache with fresh statistics.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the geometry is invalid. Nothing is
    /// allocated in that case.
    pub fn new(config: CacheConfig, name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_sink(config, name, CacheStats::default())
    }

    /// Creates a cache from a `sets:ways:linesize[:policy]` string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the string is malformed or describes an
    /// invalid geometry.
    pub fn from_config_str(config: &str, name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(config.parse()?, name)
    }
}

impl<S: CounterSink> CacheSim<S> {
    /// Creates a cache that reports its events to `sink`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the geometry is invalid.
    pub fn with_sink(
        config: CacheConfig,
        name: impl Into<String>,
        sink: S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let sets = config.sets as usize;
        let ways = config.ways;
        let lines = (0..sets)
            .flat_map(|set| std::iter::repeat_n(LineAddr::empty(set), ways))
            .collect();

        Ok(Self {
            config,
            name: name.into(),
            lines,
            policy: Policy::new(config.policy, sets, ways),
            stats: sink,
            log: false,
        })
    }

    /// Enables or disables verbose miss reporting.
    pub const fn set_log(&mut self, log: bool) {
        self.log = log;
    }

    /// Returns `true` if verbose miss reporting is enabled.
    pub const fn log(&self) -> bool {
        self.log
    }

    /// Display name used in reports and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Geometry and policy of this cache.
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The counter sink.
    pub const fn stats(&self) -> &S {
        &self.stats
    }

    /// Mutable access to the counter sink.
    pub const fn stats_mut(&mut self) -> &mut S {
        &mut self.stats
    }

    /// The eviction policy.
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Every tag-array entry, set by set.
    pub fn lines(&self) -> impl Iterator<Item = &LineAddr> {
        self.lines.iter()
    }

    /// The ways of `set`, or an empty slice if `set` is out of range.
    pub fn set_lines(&self, set: usize) -> &[LineAddr] {
        self.lines
            .get(set * self.config.ways..(set + 1) * self.config.ways)
            .unwrap_or(&[])
    }

    /// Splits `addr` using this cache's geometry.
    #[inline]
    pub const fn decompose(&self, addr: u64) -> LineAddr {
        LineAddr::decompose(addr, self.config.sets, self.config.line_bytes)
    }

    /// Rebuilds the base byte address of `line` using this cache's geometry.
    #[inline]
    pub const fn recompose(&self, line: &LineAddr) -> u64 {
        line.recompose(self.config.sets, self.config.line_bytes)
    }

    /// Returns `true` if the line containing `addr` is resident.
    ///
    /// A pure probe: no counters and no policy state change.
    pub fn contains(&self, addr: u64) -> bool {
        self.lookup(&self.decompose(addr)).is_some()
    }

    /// Returns the way of `addr`'s set holding `addr`, if any.
    pub fn lookup(&self, addr: &LineAddr) -> Option<usize> {
        self.set_lines(addr.set).iter().position(|line| line == addr)
    }

    #[inline]
    const fn slot(&self, set: usize, way: usize) -> usize {
        set * self.config.ways + way
    }

    /// Evicts a policy-chosen way of `addr`'s set and installs `addr` there, clean.
    ///
    /// # Returns
    ///
    /// The entry that was evicted. The caller must write it back if it is
    /// valid and dirty.
    pub fn victimize(&mut self, addr: &LineAddr) -> LineAddr {
        let way = self.policy.next(addr.set);
        let slot = self.slot(addr.set, way);
        let victim = self.lines[slot];

        let mut fill = *addr;
        fill.set_valid();
        fill.set_clean();
        self.lines[slot] = fill;

        self.policy.insert(addr.set, way);
        victim
    }

    /// Performs an access at this level only; misses go nowhere.
    pub fn access(&mut self, addr: u64, bytes: u64, store: bool) {
        self.access_with(addr, bytes, store, None);
    }

    /// Performs an access, forwarding fills and write-backs to `below`.
    ///
    /// On a hit the line is refreshed in the policy and dirtied by a store.
    /// On a miss a victim is evicted (written back to `below` as a store if
    /// dirty), the line is fetched from `below` as a read, and a store then
    /// dirties the freshly filled line.
    pub fn access_with(
        &mut self,
        addr: u64,
        bytes: u64,
        store: bool,
        mut below: Option<&mut dyn MissHandler>,
    ) {
        self.stats.on_access(store, bytes);

        let line = self.decompose(addr);
        if let Some(way) = self.lookup(&line) {
            trace!(cache = %self.name, addr = format_args!("{addr:#x}"), set = line.set, way, "hit");
            if store {
                let slot = self.slot(line.set, way);
                self.lines[slot].set_dirty();
            }
            self.policy.update(&line, way);
            return;
        }

        self.stats.on_miss(store);
        let line_bytes = self.config.line_bytes;
        let line_addr = self.recompose(&line);
        let kind = if store { "write" } else { "read" };
        if self.log {
            info!(target: MISS_LOG_TARGET, "{} {} miss {:#x}", self.name, kind, line_addr);
        } else {
            debug!(cache = %self.name, addr = format_args!("{line_addr:#x}"), set = line.set, kind, "miss");
        }

        let victim = self.victimize(&line);
        if victim.is_valid() && victim.is_dirty() {
            let dirty_addr = self.recompose(&victim);
            debug!(cache = %self.name, addr = format_args!("{dirty_addr:#x}"), "writeback");
            if let Some(next) = below.as_deref_mut() {
                next.access(dirty_addr, line_bytes, true);
            }
            self.stats.on_writeback();
        }

        if let Some(next) = below {
            next.access(line_addr, line_bytes, false);
        }

        if store {
            if let Some(way) = self.lookup(&line) {
                let slot = self.slot(line.set, way);
                self.lines[slot].set_dirty();
            }
        }
    }

    /// Cleans and/or invalidates lines at this level only.
    pub fn clean_invalidate(&mut self, addr: u64, bytes: u64, clean: bool, invalidate: bool) {
        self.clean_invalidate_with(addr, bytes, clean, invalidate, None);
    }

    /// Cleans and/or invalidates every line overlapping `[addr, addr + bytes)`,
    /// then forwards the same request to `below`.
    ///
    /// A resident dirty line is cleaned (one write-back and one clean event)
    /// when `clean` is set; a resident line is dropped when `invalidate` is
    /// set. Partial first and last lines count as whole lines, the range is
    /// clamped at the top of the address space, and `bytes == 0` touches
    /// nothing here. The request is forwarded even if no line matched.
    ///
    /// Ranges of at least `sets` lines are handled by one pass over the tag
    /// array, so the cost is bounded by the cache size, not the range size.
    pub fn clean_invalidate_with(
        &mut self,
        addr: u64,
        bytes: u64,
        clean: bool,
        invalidate: bool,
        below: Option<&mut dyn MissHandler>,
    ) {
        if bytes > 0 {
            let first = self.decompose(addr);
            let last = self.decompose(addr.saturating_add(bytes - 1));
            let (first_base, last_base) = (self.recompose(&first), self.recompose(&last));
            let span = ((last_base - first_base) >> self.config.line_bytes.trailing_zeros()) + 1;

            if span >= self.config.sets {
                // Every set is covered; check each resident line once.
                for slot in 0..self.lines.len() {
                    let entry = self.lines[slot];
                    let base = self.recompose(&entry);
                    if entry.is_valid() && (first_base..=last_base).contains(&base) {
                        self.maintain(slot, clean, invalidate);
                    }
                }
            } else {
                let mut cur = first;
                loop {
                    if let Some(way) = self.lookup(&cur) {
                        let slot = self.slot(cur.set, way);
                        self.maintain(slot, clean, invalidate);
                    }
                    if !cur.precedes(&last) {
                        break;
                    }
                    cur.advance(self.config.sets);
                }
            }
        }

        if let Some(next) = below {
            next.clean_invalidate(addr, bytes, clean, invalidate);
        }
    }

    /// Applies a clean and/or invalidate to the entry at `slot`.
    fn maintain(&mut self, slot: usize, clean: bool, invalidate: bool) {
        let entry = &mut self.lines[slot];
        if clean && entry.is_dirty() {
            self.stats.on_writeback();
            self.stats.on_clean();
            entry.set_clean();
            debug!(cache = %self.name, set = entry.set, slot, "clean");
        }
        if invalidate {
            entry.set_invalid();
        }
    }
}

impl<S: CounterSink> MissHandler for CacheSim<S> {
    fn access(&mut self, addr: u64, bytes: u64, store: bool) {
        self.access_with(addr, bytes, store, None);
    }

    fn clean_invalidate(&mut self, addr: u64, bytes: u64, clean: bool, invalidate: bool) {
        self.clean_invalidate_with(addr, bytes, clean, invalidate, None);
    }
}

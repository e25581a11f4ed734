//! Multi-level cache hierarchy.
//!
//! This module owns a chain of cache levels and routes requests down it. It provides:
//! 1. **Level arena:** Every level lives in one vector and is addressed by a `LevelId`.
//! 2. **Miss handlers:** A level forwards misses, write-backs and clean/invalidate
//!    requests to the level it is linked to, which must have been built before it.
//!    This keeps every chain acyclic, so recursion always terminates.
//! 3. **Core ports:** Instruction fetches go to the I-cache, loads and stores to the D-cache.
//! 4. **Reporting:** Text and JSON summaries of every level's counters.

use std::cmp::Reverse;
use std::fmt;

use tracing::warn;

use crate::cache::{CacheSim, MissHandler};
use crate::common::data::AccessType;
use crate::common::error::ConfigError;
use crate::config::{CacheConfig, HierarchyConfig};
use crate::stats::{CacheStats, CounterSink};

/// Handle to a level of a [`CacheHierarchy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelId(usize);

impl LevelId {
    /// Position of the level in build order.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Level<S: CounterSink> {
    cache: CacheSim<S>,
    miss_handler: Option<LevelId>,
}

/// Cursor standing in for the next level while a level above it is borrowed.
///
/// `levels` only holds the levels built before the one being accessed.
struct Below<'a, S: CounterSink> {
    levels: &'a mut [Level<S>],
    id: LevelId,
}

impl<S: CounterSink> MissHandler for Below<'_, S> {
    fn access(&mut self, addr: u64, bytes: u64, store: bool) {
        access_level(self.levels, self.id, addr, bytes, store);
    }

    fn clean_invalidate(&mut self, addr: u64, bytes: u64, clean: bool, invalidate: bool) {
        clean_invalidate_level(self.levels, self.id, addr, bytes, clean, invalidate);
    }
}

fn access_level<S: CounterSink>(
    levels: &mut [Level<S>],
    id: LevelId,
    addr: u64,
    bytes: u64,
    store: bool,
) {
    let split = id.0.min(levels.len());
    let (below, rest) = levels.split_at_mut(split);
    let Some(level) = rest.first_mut() else {
        warn!(level = %id, "access to unknown cache level ignored");
        return;
    };
    match level.miss_handler {
        Some(next) => {
            let mut cursor = Below { levels: below, id: next };
            let handler: &mut dyn MissHandler = &mut cursor;
            level.cache.access_with(addr, bytes, store, Some(handler));
        }
        None => level.cache.access_with(addr, bytes, store, None),
    }
}

fn clean_invalidate_level<S: CounterSink>(
    levels: &mut [Level<S>],
    id: LevelId,
    addr: u64,
    bytes: u64,
    clean: bool,
    invalidate: bool,
) {
    let split = id.0.min(levels.len());
    let (below, rest) = levels.split_at_mut(split);
    let Some(level) = rest.first_mut() else {
        warn!(level = %id, "clean/invalidate of unknown cache level ignored");
        return;
    };
    match level.miss_handler {
        Some(next) => {
            let mut cursor = Below { levels: below, id: next };
            let handler: &mut dyn MissHandler = &mut cursor;
            level
                .cache
                .clean_invalidate_with(addr, bytes, clean, invalidate, Some(handler));
        }
        None => level
            .cache
            .clean_invalidate_with(addr, bytes, clean, invalidate, None),
    }
}

/// An owned set of cache levels linked toward memory.
///
/// # Examples
///
/// ```
/// use cachesim_core::CacheSim;
/// use cachesim_core::hierarchy::CacheHierarchy;
///
/// let mut hierarchy = CacheHierarchy::new();
/// let l2 = hierarchy.push(CacheSim::from_config_str("512:8:64:lru", "L2$").unwrap());
/// let l1 = hierarchy.push(CacheSim::from_config_str("64:4:64:lru", "D$").unwrap());
/// hierarchy.set_miss_handler(l1, l2).unwrap();
///
/// hierarchy.access(l1, 0x8000_0000, 8, false);
/// hierarchy.access(l1, 0x8000_0008, 8, false);
///
/// assert_eq!(hierarchy.level(l1).unwrap().stats().read_misses, 1);
/// assert_eq!(hierarchy.level(l2).unwrap().stats().read_accesses, 1);
/// ```
#[derive(Debug)]
pub struct CacheHierarchy<S: CounterSink = CacheStats> {
    levels: Vec<Level<S>>,
    icache: Option<LevelId>,
    dcache: Option<LevelId>,
}

impl<S: CounterSink> Default for CacheHierarchy<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CounterSink> CacheHierarchy<S> {
    /// Creates an empty hierarchy.
    pub const fn new() -> Self {
        Self {
            levels: Vec::new(),
            icache: None,
            dcache: None,
        }
    }

    /// Adds a level with no miss handler and returns its id.
    pub fn push(&mut self, cache: CacheSim<S>) -> LevelId {
        let id = LevelId(self.levels.len());
        self.levels.push(Level {
            cache,
            miss_handler: None,
        });
        id
    }

    fn check(&self, id: LevelId) -> Result<(), ConfigError> {
        if id.0 < self.levels.len() {
            Ok(())
        } else {
            Err(ConfigError::UnknownLevel(id))
        }
    }

    /// Links `level` to `next`, the next level toward memory.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::UnknownLevel`] if either id is not in this hierarchy.
    /// * [`ConfigError::MissHandlerOrder`] if `next` was not built before `level`.
    pub fn set_miss_handler(&mut self, level: LevelId, next: LevelId) -> Result<(), ConfigError> {
        self.check(level)?;
        self.check(next)?;
        if next >= level {
            return Err(ConfigError::MissHandlerOrder { level, next });
        }
        self.levels[level.0].miss_handler = Some(next);
        Ok(())
    }

    /// The level `level` forwards to, if any.
    pub fn miss_handler(&self, level: LevelId) -> Option<LevelId> {
        self.levels.get(level.0).and_then(|l| l.miss_handler)
    }

    /// Routes instruction fetches to `level`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownLevel`] if `level` is not in this hierarchy.
    pub fn set_icache(&mut self, level: LevelId) -> Result<(), ConfigError> {
        self.check(level)?;
        self.icache = Some(level);
        Ok(())
    }

    /// Routes loads and stores to `level`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownLevel`] if `level` is not in this hierarchy.
    pub fn set_dcache(&mut self, level: LevelId) -> Result<(), ConfigError> {
        self.check(level)?;
        self.dcache = Some(level);
        Ok(())
    }

    /// The instruction-fetch port, if any.
    pub const fn icache(&self) -> Option<LevelId> {
        self.icache
    }

    /// The data port, if any.
    pub const fn dcache(&self) -> Option<LevelId> {
        self.dcache
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns `true` if no level has been added.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The cache at `level`.
    pub fn level(&self, level: LevelId) -> Option<&CacheSim<S>> {
        self.levels.get(level.0).map(|l| &l.cache)
    }

    /// Mutable access to the cache at `level`.
    pub fn level_mut(&mut self, level: LevelId) -> Option<&mut CacheSim<S>> {
        self.levels.get_mut(level.0).map(|l| &mut l.cache)
    }

    /// Every level with its id, in build order.
    pub fn levels(&self) -> impl Iterator<Item = (LevelId, &CacheSim<S>)> {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, l)| (LevelId(i), &l.cache))
    }

    /// Enables or disables verbose miss reporting on every level.
    pub fn set_log(&mut self, log: bool) {
        for level in &mut self.levels {
            level.cache.set_log(log);
        }
    }

    /// Performs an access at `level`, recursing down its miss-handler chain.
    ///
    /// An id from another hierarchy is logged and ignored.
    pub fn access(&mut self, level: LevelId, addr: u64, bytes: u64, store: bool) {
        access_level(&mut self.levels, level, addr, bytes, store);
    }

    /// Cleans and/or invalidates a range at `level` and every level below it.
    pub fn clean_invalidate(
        &mut self,
        level: LevelId,
        addr: u64,
        bytes: u64,
        clean: bool,
        invalidate: bool,
    ) {
        clean_invalidate_level(&mut self.levels, level, addr, bytes, clean, invalidate);
    }

    fn port(&self, kind: AccessType) -> Option<LevelId> {
        match kind {
            AccessType::Fetch => self.icache,
            AccessType::Read | AccessType::Write => self.dcache,
        }
    }

    /// Returns `true` if accesses of `kind` reach a cache.
    pub fn interested_in(&self, kind: AccessType) -> bool {
        self.port(kind).is_some()
    }

    /// Sends a core access to the port serving `kind`; ignored if there is none.
    pub fn trace(&mut self, kind: AccessType, addr: u64, bytes: u64) {
        if let Some(level) = self.port(kind) {
            self.access(level, addr, bytes, kind.is_store());
        }
    }

    /// Applies a clean/invalidate to both first-level ports.
    ///
    /// Each port forwards the request down its own chain, so a shared L2
    /// sees it once per port.
    pub fn flush(&mut self, addr: u64, bytes: u64, clean: bool, invalidate: bool) {
        let ports = [self.icache, self.dcache];
        for level in ports.into_iter().flatten() {
            self.clean_invalidate(level, addr, bytes, clean, invalidate);
        }
    }
}

impl CacheHierarchy<CacheStats> {
    /// Builds a cache with fresh statistics and adds it with no miss handler.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` is invalid; the hierarchy is
    /// left unchanged.
    pub fn add_level(
        &mut self,
        config: CacheConfig,
        name: impl Into<String>,
    ) -> Result<LevelId, ConfigError> {
        Ok(self.push(CacheSim::new(config, name)?))
    }

    /// Builds the hierarchy of one core: an optional shared `L2$` and
    /// optional `I$` and `D$` forwarding to it.
    ///
    /// # Errors
    ///
    /// Returns the first invalid level's [`ConfigError`]; no level is built
    /// unless all of them are valid.
    pub fn from_config(config: &HierarchyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut hierarchy = Self::new();

        let l2 = config
            .l2
            .map(|l2| hierarchy.add_level(l2, "L2$"))
            .transpose()?;

        if let Some(l1_i) = config.l1_i {
            let id = hierarchy.add_level(l1_i, "I$")?;
            if let Some(l2) = l2 {
                hierarchy.set_miss_handler(id, l2)?;
            }
            hierarchy.set_icache(id)?;
        }

        if let Some(l1_d) = config.l1_d {
            let id = hierarchy.add_level(l1_d, "D$")?;
            if let Some(l2) = l2 {
                hierarchy.set_miss_handler(id, l2)?;
            }
            hierarchy.set_dcache(id)?;
        }

        Ok(hierarchy)
    }

    /// Renders every level's report, closest to the core first.
    ///
    /// Levels are ordered by how many miss-handler links separate them from
    /// the end of their chain, most first. Levels at the same depth appear
    /// in reverse build order, so a core's `D$` precedes its `I$`.
    pub fn report(&self) -> String {
        let mut depth = Vec::with_capacity(self.levels.len());
        for level in &self.levels {
            // A miss handler is always built before the level it serves.
            let d = level
                .miss_handler
                .and_then(|next| depth.get(next.0))
                .map_or(0, |d: &usize| d + 1);
            depth.push(d);
        }

        let mut order: Vec<usize> = (0..self.levels.len()).rev().collect();
        order.sort_by_key(|&i| Reverse(depth[i]));
        order
            .into_iter()
            .map(|i| {
                let cache = &self.levels[i].cache;
                cache.stats().report(cache.name()).to_string()
            })
            .collect()
    }

    /// Serializes every level's counters, keyed by level name.
    ///
    /// # Errors
    ///
    /// Propagates any `serde_json` serialization failure.
    pub fn stats_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut map = serde_json::Map::new();
        for level in &self.levels {
            let _ = map.insert(
                level.cache.name().to_string(),
                serde_json::to_value(level.cache.stats())?,
            );
        }
        Ok(serde_json::Value::Object(map))
    }
}

//! # Cache Hierarchy Tests
//!
//! Covers building a core's I$/D$/L2$ layout, linking levels by hand,
//! routing core accesses through the ports, recursion down miss-handler
//! chains, and the text and JSON reports.

use cachesim_core::CacheSim;
use cachesim_core::common::{AccessType, ConfigError};
use cachesim_core::config::{CacheConfig, HierarchyConfig, ReplacementPolicy};
use cachesim_core::hierarchy::{CacheHierarchy, LevelId};
use pretty_assertions::assert_eq;

use crate::common::harness::init_tracing;

fn lru(sets: u64, ways: usize) -> Option<CacheConfig> {
    Some(CacheConfig {
        sets,
        ways,
        line_bytes: 64,
        policy: ReplacementPolicy::Lru,
    })
}

/// I$ and D$ of 4 sets × 1 way, over a 64-set × 4-way L2$.
fn core_hierarchy() -> CacheHierarchy {
    init_tracing();
    let config = HierarchyConfig {
        l1_i: lru(4, 1),
        l1_d: lru(4, 1),
        l2: lru(64, 4),
    };
    CacheHierarchy::from_config(&config).unwrap()
}

fn named(hierarchy: &CacheHierarchy, name: &str) -> LevelId {
    hierarchy
        .levels()
        .find(|(_, cache)| cache.name() == name)
        .map(|(id, _)| id)
        .unwrap()
}

fn stats<'a>(hierarchy: &'a CacheHierarchy, name: &str) -> &'a cachesim_core::stats::CacheStats {
    hierarchy.level(named(hierarchy, name)).unwrap().stats()
}

// ─── Construction ──────────────────────────────────────────────────────────

#[test]
fn from_config_builds_named_levels() {
    let hierarchy = core_hierarchy();
    let names: Vec<&str> = hierarchy.levels().map(|(_, c)| c.name()).collect();
    assert_eq!(names, vec!["L2$", "I$", "D$"]);

    let l2 = named(&hierarchy, "L2$");
    assert_eq!(hierarchy.icache(), Some(named(&hierarchy, "I$")));
    assert_eq!(hierarchy.dcache(), Some(named(&hierarchy, "D$")));
    assert_eq!(hierarchy.miss_handler(named(&hierarchy, "I$")), Some(l2));
    assert_eq!(hierarchy.miss_handler(named(&hierarchy, "D$")), Some(l2));
    assert_eq!(hierarchy.miss_handler(l2), None);
}

#[test]
fn from_config_without_l2() {
    let config = HierarchyConfig {
        l1_i: None,
        l1_d: lru(16, 2),
        l2: None,
    };
    let hierarchy = CacheHierarchy::from_config(&config).unwrap();
    assert_eq!(hierarchy.len(), 1);
    let dcache = hierarchy.dcache().unwrap();
    assert_eq!(hierarchy.miss_handler(dcache), None);
    assert!(!hierarchy.interested_in(AccessType::Fetch));
    assert!(hierarchy.interested_in(AccessType::Read));
    assert!(hierarchy.interested_in(AccessType::Write));
}

#[test]
fn empty_config_builds_nothing() {
    let hierarchy = CacheHierarchy::from_config(&HierarchyConfig::default()).unwrap();
    assert!(hierarchy.is_empty());
    assert!(hierarchy.report().is_empty());
}

#[test]
fn from_config_rejects_any_bad_level() {
    let config = HierarchyConfig {
        l1_i: lru(64, 4),
        l1_d: Some(CacheConfig {
            sets: 64,
            ways: 0,
            line_bytes: 64,
            policy: ReplacementPolicy::Lru,
        }),
        l2: None,
    };
    assert_eq!(
        CacheHierarchy::from_config(&config).err(),
        Some(ConfigError::ZeroWays)
    );
}

// ─── Linking ───────────────────────────────────────────────────────────────

#[test]
fn miss_handler_must_be_built_first() {
    let mut hierarchy = CacheHierarchy::new();
    let first = hierarchy.push(CacheSim::from_config_str("4:1:64:lru", "A$").unwrap());
    let second = hierarchy.push(CacheSim::from_config_str("4:1:64:lru", "B$").unwrap());

    assert_eq!(
        hierarchy.set_miss_handler(first, second),
        Err(ConfigError::MissHandlerOrder {
            level: first,
            next: second,
        })
    );
    assert_eq!(
        hierarchy.set_miss_handler(second, second),
        Err(ConfigError::MissHandlerOrder {
            level: second,
            next: second,
        })
    );
    assert_eq!(hierarchy.set_miss_handler(second, first), Ok(()));
    assert_eq!(hierarchy.miss_handler(second), Some(first));
    assert_eq!(hierarchy.miss_handler(first), None);
}

#[test]
fn foreign_level_ids_are_rejected() {
    let bigger = core_hierarchy();
    let foreign = named(&bigger, "D$");

    let mut hierarchy = CacheHierarchy::new();
    let only = hierarchy.push(CacheSim::from_config_str("4:1:64:lru", "A$").unwrap());

    assert_eq!(
        hierarchy.set_miss_handler(foreign, only),
        Err(ConfigError::UnknownLevel(foreign))
    );
    assert_eq!(
        hierarchy.set_dcache(foreign),
        Err(ConfigError::UnknownLevel(foreign))
    );
    assert!(hierarchy.level(foreign).is_none());

    // Accesses through a foreign id are ignored.
    hierarchy.access(foreign, 0x40, 8, false);
    hierarchy.clean_invalidate(foreign, 0x40, 8, true, true);
    assert_eq!(hierarchy.level(only).unwrap().stats().accesses(), 0);
}

#[test]
fn add_level_rejects_bad_geometry() {
    let mut hierarchy = CacheHierarchy::new();
    let config = CacheConfig {
        sets: 64,
        ways: 4,
        line_bytes: 12,
        policy: ReplacementPolicy::Fifo,
    };
    assert_eq!(
        hierarchy.add_level(config, "X$"),
        Err(ConfigError::InvalidLineSize(12))
    );
    assert!(hierarchy.is_empty());
}

#[test]
fn level_id_display() {
    let hierarchy = core_hierarchy();
    let l2 = named(&hierarchy, "L2$");
    assert_eq!(l2.index(), 0);
    assert_eq!(l2.to_string(), "#0");
}

// ─── Routing ───────────────────────────────────────────────────────────────

#[test]
fn trace_routes_by_access_type() {
    let mut hierarchy = core_hierarchy();
    hierarchy.trace(AccessType::Fetch, 0x1000, 4);
    hierarchy.trace(AccessType::Read, 0x2000, 8);
    hierarchy.trace(AccessType::Write, 0x2008, 8);

    let icache = stats(&hierarchy, "I$");
    assert_eq!(icache.read_accesses, 1);
    assert_eq!(icache.write_accesses, 0);

    let dcache = stats(&hierarchy, "D$");
    assert_eq!(dcache.read_accesses, 1);
    assert_eq!(dcache.write_accesses, 1);
    assert_eq!(dcache.misses(), 1);

    // One fill per L1 miss, always as a line-sized read.
    let l2 = stats(&hierarchy, "L2$");
    assert_eq!(l2.read_accesses, 2);
    assert_eq!(l2.bytes_read, 128);
    assert_eq!(l2.write_accesses, 0);
}

#[test]
fn trace_without_port_is_ignored() {
    let config = HierarchyConfig {
        l1_i: lru(4, 1),
        l1_d: None,
        l2: None,
    };
    let mut hierarchy = CacheHierarchy::from_config(&config).unwrap();
    hierarchy.trace(AccessType::Read, 0x40, 8);
    hierarchy.trace(AccessType::Write, 0x40, 8);
    assert_eq!(stats(&hierarchy, "I$").accesses(), 0);
}

/// The same line missing in both L1s is fetched from the shared L2 twice
/// but misses there once.
#[test]
fn l2_is_shared_by_both_ports() {
    let mut hierarchy = core_hierarchy();
    hierarchy.trace(AccessType::Fetch, 0x8000_0000, 4);
    hierarchy.trace(AccessType::Read, 0x8000_0000, 8);

    let l2 = stats(&hierarchy, "L2$");
    assert_eq!(l2.read_accesses, 2);
    assert_eq!(l2.read_misses, 1);
}

/// A dirty D$ victim lands in the L2 as a store.
#[test]
fn writeback_reaches_l2() {
    let mut hierarchy = core_hierarchy();
    // 4 sets × 64-byte lines: 0x000 and 0x100 share D$ set 0.
    hierarchy.trace(AccessType::Write, 0x000, 8);
    hierarchy.trace(AccessType::Read, 0x100, 8);

    assert_eq!(stats(&hierarchy, "D$").writebacks, 1);
    let l2 = stats(&hierarchy, "L2$");
    assert_eq!(l2.write_accesses, 1);
    assert_eq!(l2.bytes_written, 64);
    assert!(hierarchy.level(named(&hierarchy, "L2$")).unwrap().contains(0x000));
}

/// Recursion follows arbitrarily long chains to the last level.
#[test]
fn three_level_chain() {
    init_tracing();
    let mut hierarchy = CacheHierarchy::new();
    let l3 = hierarchy
        .add_level("256:8:64:lru".parse().unwrap(), "L3$")
        .unwrap();
    let l2 = hierarchy.push(CacheSim::from_config_str("64:4:64:lru", "L2$").unwrap());
    let l1 = hierarchy.push(CacheSim::from_config_str("4:1:64:lru", "L1$").unwrap());
    hierarchy.set_miss_handler(l2, l3).unwrap();
    hierarchy.set_miss_handler(l1, l2).unwrap();

    hierarchy.access(l1, 0x4000, 8, false);
    hierarchy.access(l1, 0x4000, 8, false);
    hierarchy.access(l1, 0x4100, 8, true);

    assert_eq!(hierarchy.level(l1).unwrap().stats().misses(), 2);
    assert_eq!(hierarchy.level(l2).unwrap().stats().read_accesses, 2);
    assert_eq!(hierarchy.level(l3).unwrap().stats().read_accesses, 2);

    hierarchy.clean_invalidate(l1, 0x4000, 0x200, false, true);
    for id in [l1, l2, l3] {
        assert!(!hierarchy.level(id).unwrap().contains(0x4000));
    }
}

#[test]
fn level_mut_allows_direct_access() {
    let mut hierarchy = core_hierarchy();
    let l2 = named(&hierarchy, "L2$");
    hierarchy.level_mut(l2).unwrap().access(0x40, 8, false);
    assert_eq!(stats(&hierarchy, "L2$").read_misses, 1);
    assert_eq!(stats(&hierarchy, "D$").accesses(), 0);
}

#[test]
fn set_log_reaches_every_level() {
    let mut hierarchy = core_hierarchy();
    hierarchy.set_log(true);
    assert!(hierarchy.levels().all(|(_, cache)| cache.log()));
}

// ─── Flush ─────────────────────────────────────────────────────────────────

#[test]
fn flush_invalidates_every_level() {
    let mut hierarchy = core_hierarchy();
    hierarchy.trace(AccessType::Fetch, 0x400, 4);
    hierarchy.trace(AccessType::Read, 0x400, 8);
    hierarchy.flush(0x400, 64, false, true);

    for (_, cache) in hierarchy.levels() {
        assert!(!cache.contains(0x400), "{} still holds the line", cache.name());
    }
}

/// Both ports forward to the shared L2, which only cleans its dirty line once.
#[test]
fn flush_cleans_shared_l2_once() {
    let mut hierarchy = core_hierarchy();
    let l2 = named(&hierarchy, "L2$");
    hierarchy.access(l2, 0x400, 8, true);
    hierarchy.trace(AccessType::Write, 0x400, 8);

    hierarchy.flush(0x400, 8, true, false);

    assert_eq!(stats(&hierarchy, "D$").cleans, 1);
    assert_eq!(stats(&hierarchy, "I$").cleans, 0);
    assert_eq!(stats(&hierarchy, "L2$").cleans, 1);
    assert_eq!(stats(&hierarchy, "L2$").writebacks, 1);
    assert!(hierarchy.level(l2).unwrap().contains(0x400));
}

// ─── Reports ───────────────────────────────────────────────────────────────

#[test]
fn report_lists_levels_closest_to_core_first() {
    let mut hierarchy = core_hierarchy();
    hierarchy.trace(AccessType::Fetch, 0x1000, 4);
    hierarchy.trace(AccessType::Read, 0x2000, 8);

    let report = hierarchy.report();
    let d = report.find("D$ Bytes Read:").unwrap();
    let i = report.find("I$ Bytes Read:").unwrap();
    let l2 = report.find("L2$ Bytes Read:").unwrap();
    assert!(d < i && i < l2, "unexpected order:\n{report}");
    assert!(report.contains("L2$ Read Accesses:         2\n"));
    assert_eq!(report.lines().count(), 24);
}

/// Levels built by hand are ordered by their distance from memory, not
/// only by build order.
#[test]
fn report_orders_hand_built_chains_by_depth() {
    init_tracing();
    let mut hierarchy = CacheHierarchy::new();
    let l2a = hierarchy.push(CacheSim::from_config_str("64:4:64:lru", "L2A$").unwrap());
    let l1a = hierarchy.push(CacheSim::from_config_str("4:1:64:lru", "L1A$").unwrap());
    let l2b = hierarchy.push(CacheSim::from_config_str("64:4:64:lru", "L2B$").unwrap());
    let l1b = hierarchy.push(CacheSim::from_config_str("4:1:64:lru", "L1B$").unwrap());
    hierarchy.set_miss_handler(l1a, l2a).unwrap();
    hierarchy.set_miss_handler(l1b, l2b).unwrap();

    hierarchy.access(l1a, 0x4000, 8, false);
    hierarchy.access(l1b, 0x8000, 8, false);

    let report = hierarchy.report();
    let pos = |name: &str| report.find(&format!("{name} Bytes Read:")).unwrap();
    let order = [pos("L1B$"), pos("L1A$"), pos("L2B$"), pos("L2A$")];
    assert!(order.is_sorted(), "unexpected order:\n{report}");
}

#[test]
fn report_omits_idle_levels() {
    let mut hierarchy = core_hierarchy();
    hierarchy.trace(AccessType::Fetch, 0x1000, 4);
    let report = hierarchy.report();
    assert!(report.contains("I$ Miss Rate:             100.000%"));
    assert!(!report.contains("D$"));
}

#[test]
fn stats_json_is_keyed_by_name() {
    let mut hierarchy = core_hierarchy();
    hierarchy.trace(AccessType::Write, 0x40, 8);

    let json = hierarchy.stats_json().unwrap();
    let object = json.as_object().unwrap();
    let mut keys: Vec<&String> = object.keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["D$", "I$", "L2$"]);
    assert_eq!(json["D$"]["write_misses"], 1);
    assert_eq!(json["D$"]["bytes_written"], 8);
    assert_eq!(json["L2$"]["read_accesses"], 1);
    assert_eq!(json["I$"]["read_accesses"], 0);
}

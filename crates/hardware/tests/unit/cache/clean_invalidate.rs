//! Clean and Invalidate Tests.
//!
//! Verifies range maintenance on a single level and its forwarding to the
//! next one: which lines a range covers, when a clean counts as a
//! write-back, and that repeated requests are harmless.

use cachesim_core::CacheSim;
use cachesim_core::config::ReplacementPolicy;
use pretty_assertions::assert_eq;

use crate::common::harness::{line_in_set, small_cache};

fn is_dirty(cache: &CacheSim, addr: u64) -> bool {
    let line = cache.decompose(addr);
    cache
        .lookup(&line)
        .is_some_and(|way| cache.set_lines(line.set)[way].is_dirty())
}

/// Stores to every address, leaving each line dirty.
fn dirty_cache(addrs: &[u64]) -> CacheSim {
    let mut cache = small_cache(ReplacementPolicy::Lru);
    for &addr in addrs {
        cache.access(addr, 8, true);
    }
    cache
}

// ══════════════════════════════════════════════════════════
// 1. Clean and invalidate flags
// ══════════════════════════════════════════════════════════

#[test]
fn clean_writes_back_and_keeps_line() {
    let mut cache = dirty_cache(&[0x40]);
    cache.clean_invalidate(0x40, 8, true, false);

    assert!(cache.contains(0x40));
    assert!(!is_dirty(&cache, 0x40));
    assert_eq!(cache.stats().writebacks, 1);
    assert_eq!(cache.stats().cleans, 1);
}

/// A second clean finds nothing dirty.
#[test]
fn clean_is_idempotent() {
    let mut cache = dirty_cache(&[0x40]);
    cache.clean_invalidate(0x40, 8, true, false);
    cache.clean_invalidate(0x40, 8, true, false);
    assert_eq!(cache.stats().writebacks, 1);
    assert_eq!(cache.stats().cleans, 1);
}

/// Invalidating alone drops dirty data without a write-back.
#[test]
fn invalidate_only_discards_dirty_line() {
    let mut cache = dirty_cache(&[0x40]);
    cache.clean_invalidate(0x40, 8, false, true);

    assert!(!cache.contains(0x40));
    assert_eq!(cache.stats().writebacks, 0);
    assert_eq!(cache.stats().cleans, 0);
}

#[test]
fn clean_and_invalidate() {
    let mut cache = dirty_cache(&[0x40]);
    cache.clean_invalidate(0x40, 8, true, true);
    cache.clean_invalidate(0x40, 8, true, true);

    assert!(!cache.contains(0x40));
    assert_eq!(cache.stats().writebacks, 1);
    assert_eq!(cache.stats().cleans, 1);
}

#[test]
fn clean_of_clean_line_counts_nothing() {
    let mut cache = small_cache(ReplacementPolicy::Lru);
    cache.access(0x40, 8, false);
    cache.clean_invalidate(0x40, 8, true, false);
    assert!(cache.contains(0x40));
    assert_eq!(cache.stats().writebacks, 0);
    assert_eq!(cache.stats().cleans, 0);
}

/// Requests only change line state, never access counters.
#[test]
fn maintenance_is_not_an_access() {
    let mut cache = dirty_cache(&[0x00, 0x10]);
    let before = cache.stats().accesses();
    cache.clean_invalidate(0x00, 0x20, true, true);
    cache.clean_invalidate(0x1000, 0x20, true, true);
    assert_eq!(cache.stats().accesses(), before);
    assert_eq!(cache.stats().misses(), 2);
}

// ══════════════════════════════════════════════════════════
// 2. Range coverage
// ══════════════════════════════════════════════════════════

/// Partial first and last lines are covered whole.
#[test]
fn partial_lines_are_covered() {
    let mut cache = dirty_cache(&[0x00, 0x10, 0x20, 0x30]);
    // [0x0f, 0x21) touches lines 0x00, 0x10 and 0x20.
    cache.clean_invalidate(0x0f, 0x12, false, true);

    assert!(!cache.contains(0x00));
    assert!(!cache.contains(0x10));
    assert!(!cache.contains(0x20));
    assert!(cache.contains(0x30));
}

/// A single byte covers exactly its line.
#[test]
fn single_byte_covers_one_line() {
    let mut cache = dirty_cache(&[0x00, 0x10]);
    cache.clean_invalidate(0x1f, 1, true, false);
    assert!(is_dirty(&cache, 0x00));
    assert!(!is_dirty(&cache, 0x10));
}

/// The walk wraps from the last set back to set 0 with the next tag.
#[test]
fn range_wraps_across_sets() {
    let addrs = [
        line_in_set(0, 0),
        line_in_set(1, 0),
        line_in_set(0, 1),
        line_in_set(1, 1),
    ];
    let mut cache = dirty_cache(&addrs);
    // Lines 0x00 through 0x50, i.e. tags 0 and 1 of sets 0 and 1.
    cache.clean_invalidate(0x00, 0x60, true, true);

    for addr in addrs {
        assert!(!cache.contains(addr), "{addr:#x} survived");
    }
    assert_eq!(cache.stats().cleans, 4);
}

/// Lines of other tags in the covered sets are untouched.
#[test]
fn other_tags_are_untouched() {
    let mut cache = dirty_cache(&[line_in_set(2, 0), line_in_set(2, 5)]);
    cache.clean_invalidate(line_in_set(2, 0), 16, true, true);
    assert!(!cache.contains(line_in_set(2, 0)));
    assert!(is_dirty(&cache, line_in_set(2, 5)));
}

#[test]
fn zero_bytes_touches_nothing() {
    let mut cache = dirty_cache(&[0x40]);
    cache.clean_invalidate(0x40, 0, true, true);
    assert!(is_dirty(&cache, 0x40));
    assert_eq!(cache.stats().cleans, 0);
}

/// Ranges running off the top of the address space stop at the last line.
#[test]
fn range_clamps_at_top_of_address_space() {
    let top = u64::MAX - 0xf;
    let mut cache = dirty_cache(&[top, 0x00]);
    cache.clean_invalidate(top, 0x100, true, true);

    assert!(!cache.contains(top));
    assert!(cache.contains(0x00));
    assert_eq!(cache.stats().cleans, 1);

    cache.clean_invalidate(u64::MAX, u64::MAX, true, true);
    assert!(cache.contains(0x00));
}

/// Huge ranges finish in one pass over the tag array and still respect
/// their bounds.
#[test]
fn huge_range_is_bounded_by_cache_size() {
    let top = u64::MAX - 0xf;
    let mut cache = dirty_cache(&[0x40, 0x1_0000_0000_0040, top]);
    cache.clean_invalidate(0, 1 << 40, true, true);

    assert!(!cache.contains(0x40));
    assert!(cache.contains(0x1_0000_0000_0040));
    assert!(cache.contains(top));
    assert_eq!(cache.stats().cleans, 1);

    cache.clean_invalidate(0, u64::MAX, true, true);
    assert!(cache.lines().all(|l| !l.is_valid()));
    assert_eq!(cache.stats().cleans, 3);
    assert_eq!(cache.stats().writebacks, 3);
}

/// A range of exactly `sets` lines takes the tag-array pass; lines just
/// outside it on either side survive.
#[test]
fn range_of_all_sets_keeps_its_bounds() {
    let mut cache = dirty_cache(&[0x00, 0x10, 0x20, 0x30, 0x40, 0x50]);
    // [0x10, 0x50) is four lines: 0x10, 0x20, 0x30 and 0x40.
    cache.clean_invalidate(0x10, 0x40, false, true);

    assert!(cache.contains(0x00));
    for addr in [0x10, 0x20, 0x30, 0x40] {
        assert!(!cache.contains(addr), "{addr:#x} survived");
    }
    assert!(cache.contains(0x50));
}

// ══════════════════════════════════════════════════════════
// 3. Forwarding
// ══════════════════════════════════════════════════════════

/// The request reaches the next level, which applies it to its own lines.
#[test]
fn request_is_forwarded_below() {
    let mut l1 = small_cache(ReplacementPolicy::Lru);
    let mut l2 = CacheSim::from_config_str("64:8:16:lru", "L2$").unwrap();
    l1.access_with(0x80, 8, true, Some(&mut l2));
    assert!(l2.contains(0x80));

    l1.clean_invalidate_with(0x80, 8, true, true, Some(&mut l2));

    assert!(!l1.contains(0x80));
    assert!(!l2.contains(0x80));
    assert_eq!(l1.stats().cleans, 1);
    // A clean is counted where it happens; it is not replayed as a store.
    assert_eq!(l2.stats().write_accesses, 0);
    assert_eq!(l2.stats().cleans, 0);
}

/// Forwarding happens even when this level holds none of the range.
#[test]
fn forwarded_on_local_miss() {
    let mut l1 = small_cache(ReplacementPolicy::Lru);
    let mut l2 = CacheSim::from_config_str("64:8:16:lru", "L2$").unwrap();
    l2.access(0x100, 8, true);

    l1.clean_invalidate_with(0x100, 8, true, false, Some(&mut l2));
    assert_eq!(l2.stats().cleans, 1);
    assert!(l2.contains(0x100));
}

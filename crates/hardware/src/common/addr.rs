//! Decomposed cache-line addresses.
//!
//! A raw byte address is split into a set index and a tag using pure bit
//! arithmetic. It provides the following:
//! 1. **Decomposition:** `addr >> log2(line_bytes)` yields the line number, whose
//!    low `log2(sets)` bits select the set and whose remaining bits form the tag.
//! 2. **Recomposition:** The inverse mapping back to the line's base byte address.
//! 3. **Line Walking:** Stepping to the following line without redoing the split.
//!
//! The same type doubles as a tag-array entry, so it also carries the
//! `valid` and `dirty` state bits of the line it describes.

/// A byte address split into `(tag, set)`, plus line state bits.
///
/// Identity is deliberately narrow: two addresses are equal only when both
/// are valid and their tags match. The set index is implied by the set the
/// entries are compared within, and an invalid entry is never equal to
/// anything, including itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineAddr {
    /// Address bits above the set index and line offset.
    pub tag: u64,
    /// Set index in `0..sets`.
    pub set: usize,
    valid: bool,
    dirty: bool,
}

impl LineAddr {
    /// Returns an invalid, clean entry belonging to `set`.
    ///
    /// Used to initialize the tag array.
    #[inline]
    pub const fn empty(set: usize) -> Self {
        Self {
            tag: 0,
            set,
            valid: false,
            dirty: false,
        }
    }

    /// Splits `addr` into tag and set index.
    ///
    /// `sets` and `line_bytes` must be powers of two; cache configuration
    /// validation guarantees this before any address is decomposed.
    ///
    /// # Arguments
    ///
    /// * `addr` - Raw byte address.
    /// * `sets` - Number of sets in the cache.
    /// * `line_bytes` - Line size in bytes.
    ///
    /// # Returns
    ///
    /// A valid, clean `LineAddr` for the line containing `addr`.
    #[inline]
    pub const fn decompose(addr: u64, sets: u64, line_bytes: u64) -> Self {
        let stripped = addr >> line_bytes.trailing_zeros();
        Self {
            tag: stripped >> sets.trailing_zeros(),
            set: (stripped & (sets - 1)) as usize,
            valid: true,
            dirty: false,
        }
    }

    /// Rebuilds the base byte address of the line.
    ///
    /// Round-trips with [`LineAddr::decompose`] for line-aligned addresses;
    /// the within-line offset is not recoverable.
    #[inline]
    pub const fn recompose(&self, sets: u64, line_bytes: u64) -> u64 {
        ((self.tag << sets.trailing_zeros()) | self.set as u64) << line_bytes.trailing_zeros()
    }

    /// Steps to the immediately following cache line.
    ///
    /// The set index wraps to zero and carries into the tag after the last set.
    #[inline]
    pub const fn advance(&mut self, sets: u64) {
        if self.set as u64 == sets - 1 {
            self.tag = self.tag.wrapping_add(1);
            self.set = 0;
        } else {
            self.set += 1;
        }
    }

    /// Address order used by range walks: by tag, then by set index.
    ///
    /// Always `false` when either side is invalid.
    #[inline]
    pub const fn precedes(&self, other: &Self) -> bool {
        self.valid
            && other.valid
            && (self.tag < other.tag || (self.tag == other.tag && self.set < other.set))
    }

    /// Returns `true` if the entry holds a line.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns `true` if the line has been written since it was filled or cleaned.
    #[inline]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the entry as holding a line.
    #[inline]
    pub const fn set_valid(&mut self) {
        self.valid = true;
    }

    /// Drops the line. The dirty bit is left as is; it is meaningless once invalid.
    #[inline]
    pub const fn set_invalid(&mut self) {
        self.valid = false;
    }

    /// Marks the line as modified.
    #[inline]
    pub const fn set_dirty(&mut self) {
        self.dirty = true;
    }

    /// Marks the line as matching the next level.
    #[inline]
    pub const fn set_clean(&mut self) {
        self.dirty = false;
    }
}

impl PartialEq for LineAddr {
    fn eq(&self, other: &Self) -> bool {
        self.valid && other.valid && self.tag == other.tag
    }
}

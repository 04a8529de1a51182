//! Immutable sorted range table with binary-search lookup
//!
//! A [`LookupTable`] is the query surface of the whole system: an ordered,
//! strictly non-overlapping sequence of inclusive [`Range`]s over one
//! address family. Gaps between ranges are implicit unassigned space; a
//! query landing in a gap returns `None` rather than misattributing the
//! address to a neighbor.
//!
//! Tables are immutable after construction, so they can be shared across
//! any number of concurrent readers without locking (wrap in `Arc` and
//! publish a fresh table to hot-swap datasets).

use crate::addr::Address;
use crate::country::CountryCode;
use crate::error::{AtlasError, Result};
use std::cmp::Ordering;

/// A contiguous, inclusive interval of addresses attributed to one country
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range<A: Address> {
    start: A,
    end: A,
    country: CountryCode,
}

impl<A: Address> Range<A> {
    /// Create a range; `start` must not exceed `end`
    pub fn new(start: A, end: A, country: CountryCode) -> Result<Self> {
        if start > end {
            return Err(AtlasError::InvalidRecord(format!(
                "range start {} exceeds end {}",
                start, end
            )));
        }
        Ok(Range { start, end, country })
    }

    /// First address of the range
    pub fn start(&self) -> A {
        self.start
    }

    /// Last address of the range (inclusive)
    pub fn end(&self) -> A {
        self.end
    }

    /// Owning country
    pub fn country(&self) -> CountryCode {
        self.country
    }

    /// Number of addresses covered
    ///
    /// Always at least 1; `start <= end` is enforced at construction, so
    /// there is no `is_empty`.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u128 {
        self.end.offset_from(self.start) + 1
    }

    /// Whether the range contains the address
    pub fn contains(&self, addr: A) -> bool {
        self.start <= addr && addr <= self.end
    }

    /// Extend the range to a new, larger end address
    ///
    /// Used by the normalizer when merging contiguous same-country ranges.
    pub(crate) fn extend_end(&mut self, end: A) {
        debug_assert!(end >= self.end);
        self.end = end;
    }

    /// Ordering of this range relative to a single address
    ///
    /// `Equal` means the address falls inside the inclusive bounds; this is
    /// what lets `binary_search_by` locate the containing range directly.
    fn cmp_addr(&self, addr: A) -> Ordering {
        if self.end < addr {
            Ordering::Less
        } else if self.start > addr {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// An immutable, sorted sequence of ranges for one address family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable<A: Address> {
    ranges: Vec<Range<A>>,
}

// Derived Default would demand `A: Default`, which the address types
// don't implement
impl<A: Address> Default for LookupTable<A> {
    fn default() -> Self {
        LookupTable::empty()
    }
}

impl<A: Address> LookupTable<A> {
    /// An empty table; every lookup returns `None`
    pub fn empty() -> Self {
        LookupTable { ranges: Vec::new() }
    }

    /// Build a table from an already-sorted, non-overlapping range sequence
    ///
    /// This is the trust boundary for data arriving from outside the
    /// process (snapshot files): adjacent ranges must satisfy
    /// `prev.end < next.start`. Violations are reported as
    /// [`AtlasError::CorruptDataset`]. Normalizer output always passes.
    pub fn from_sorted_ranges(ranges: Vec<Range<A>>) -> Result<Self> {
        for pair in ranges.windows(2) {
            if pair[0].end >= pair[1].start {
                return Err(AtlasError::CorruptDataset(format!(
                    "ranges out of order or overlapping: [{}, {}] then [{}, {}]",
                    pair[0].start, pair[0].end, pair[1].start, pair[1].end
                )));
            }
        }
        Ok(LookupTable { ranges })
    }

    /// Resolve an address to its owning country
    ///
    /// Binary search over the sorted ranges; O(log n). Returns `None` when
    /// the address falls in a gap between allocations.
    pub fn resolve(&self, addr: A) -> Option<CountryCode> {
        self.ranges
            .binary_search_by(|range| range.cmp_addr(addr))
            .ok()
            .map(|i| self.ranges[i].country)
    }

    /// The ranges in order
    pub fn ranges(&self) -> &[Range<A>] {
        &self.ranges
    }

    /// Number of ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the table holds no ranges
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of addresses covered by all ranges
    pub fn coverage(&self) -> u128 {
        self.ranges.iter().map(Range::len).sum()
    }
}

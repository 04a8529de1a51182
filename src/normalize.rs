//! Range normalization: raw allocation records to a sorted, disjoint table
//!
//! Upstream allocation data is messy: records arrive unordered, duplicated,
//! and overlapping (registries re-publish broader blocks after
//! sub-delegating parts of them). This module turns that into the strict
//! form the lookup table requires: sorted, non-overlapping, gap-explicit.
//!
//! The sweep works left to right over records sorted by `(start, end,
//! input index)`, maintaining a frontier (the highest address already
//! assigned). Records reaching past the frontier are clipped to begin just
//! above it; records entirely at or below it are dropped. How overlaps are
//! treated is controlled by [`OverlapPolicy`] since upstream conventions
//! vary. A final pass merges contiguous ranges with the same country to
//! minimize table size.
//!
//! Normalization is deterministic and idempotent: running it on its own
//! output yields the same sequence.

use crate::addr::Address;
use crate::country::CountryCode;
use crate::error::{AtlasError, Result};
use crate::table::Range;
use rayon::slice::ParallelSliceMut;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A raw `(start, end, country)` allocation record, pre-normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<A: Address> {
    start: A,
    end: A,
    country: CountryCode,
}

impl<A: Address> RawRecord<A> {
    /// Create a record; `start` must not exceed `end`
    pub fn new(start: A, end: A, country: CountryCode) -> Result<Self> {
        if start > end {
            return Err(AtlasError::InvalidRecord(format!(
                "record start {} exceeds end {}",
                start, end
            )));
        }
        Ok(RawRecord { start, end, country })
    }

    /// First address of the record
    pub fn start(&self) -> A {
        self.start
    }

    /// Last address of the record (inclusive)
    pub fn end(&self) -> A {
        self.end
    }

    /// Claimed country
    pub fn country(&self) -> CountryCode {
        self.country
    }
}

/// How to resolve records that claim already-assigned address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Earlier-sorted record wins; later claims over assigned space are
    /// clipped or dropped. Matches benign registry re-publication, so this
    /// is the default.
    #[default]
    FirstWins,
    /// Any overlap is an error
    Reject,
    /// Smaller (more specific) records claim space before larger ones
    MostSpecificWins,
}

impl FromStr for OverlapPolicy {
    type Err = AtlasError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "first-wins" => Ok(OverlapPolicy::FirstWins),
            "reject" => Ok(OverlapPolicy::Reject),
            "most-specific" => Ok(OverlapPolicy::MostSpecificWins),
            other => Err(AtlasError::InvalidRecord(format!(
                "unknown overlap policy '{}' (expected first-wins, reject, or most-specific)",
                other
            ))),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::FirstWins => write!(f, "first-wins"),
            OverlapPolicy::Reject => write!(f, "reject"),
            OverlapPolicy::MostSpecificWins => write!(f, "most-specific"),
        }
    }
}

/// Normalize raw records into a sorted, non-overlapping range sequence
///
/// The output satisfies `r[i].end < r[i+1].start` for all adjacent pairs
/// and contains no two contiguous ranges with the same country.
///
/// # Errors
///
/// `EmptyInput` if `records` is empty; `OverlappingRecords` under the
/// `Reject` policy when any two records overlap.
pub fn normalize<A: Address>(
    records: Vec<RawRecord<A>>,
    policy: OverlapPolicy,
) -> Result<Vec<Range<A>>> {
    if records.is_empty() {
        return Err(AtlasError::EmptyInput);
    }

    let finalized = match policy {
        OverlapPolicy::FirstWins => sweep(records, false)?,
        OverlapPolicy::Reject => sweep(records, true)?,
        OverlapPolicy::MostSpecificWins => carve_most_specific(records)?,
    };

    Ok(merge_contiguous(finalized))
}

/// Frontier sweep over records sorted by `(start, end, input index)`
///
/// In strict mode any contact with already-assigned space is an error;
/// otherwise later claims are clipped or dropped (first-sorted-wins).
fn sweep<A: Address>(records: Vec<RawRecord<A>>, strict: bool) -> Result<Vec<Range<A>>> {
    let mut indexed: Vec<(usize, RawRecord<A>)> = records.into_iter().enumerate().collect();
    // Ties broken by end (shorter range first), then by the stable input
    // index, keeping normalization deterministic. Allocation files run to
    // millions of records, hence the parallel sort.
    indexed.par_sort_unstable_by_key(|&(idx, r)| (r.start, r.end, idx));

    let mut out: Vec<Range<A>> = Vec::with_capacity(indexed.len());
    let mut last_end: Option<A> = None;

    for (_, record) in indexed {
        let start = match last_end {
            None => record.start,
            Some(frontier) => {
                if record.end <= frontier {
                    // Pure duplicate or subset of assigned space
                    if strict {
                        return Err(overlap_error(&record, frontier));
                    }
                    continue;
                }
                if record.start <= frontier {
                    if strict {
                        return Err(overlap_error(&record, frontier));
                    }
                    // Clip to just above the frontier; the successor exists
                    // because record.end > frontier
                    match frontier.checked_succ() {
                        Some(succ) => succ,
                        None => continue,
                    }
                } else {
                    record.start
                }
            }
        };

        out.push(Range::new(start, record.end, record.country)?);
        last_end = Some(record.end);
    }

    Ok(out)
}

fn overlap_error<A: Address>(record: &RawRecord<A>, frontier: A) -> AtlasError {
    AtlasError::OverlappingRecords(format!(
        "record [{}, {}] ({}) overlaps space assigned up to {}",
        record.start(),
        record.end(),
        record.country(),
        frontier
    ))
}

/// Most-specific-wins assignment
///
/// Records are processed in order of ascending span, so smaller claims land
/// first; each later record only claims whatever parts of its interval are
/// still free, splitting around already-claimed space.
fn carve_most_specific<A: Address>(records: Vec<RawRecord<A>>) -> Result<Vec<Range<A>>> {
    let mut indexed: Vec<(usize, RawRecord<A>)> = records.into_iter().enumerate().collect();
    indexed.par_sort_unstable_by_key(|&(idx, r)| (r.end.offset_from(r.start), r.start, idx));

    // Disjoint claimed intervals keyed by start address
    let mut claimed: BTreeMap<A, Range<A>> = BTreeMap::new();

    for (_, record) in indexed {
        let overlaps: Vec<(A, A)> = claimed
            .range(..=record.end)
            .map(|(_, r)| (r.start(), r.end()))
            .filter(|&(_, end)| end >= record.start)
            .collect();

        // Walk the record's interval, emitting the unclaimed pieces between
        // (and around) existing claims
        let mut cursor = Some(record.start);
        let mut free: Vec<(A, A)> = Vec::new();
        for (claim_start, claim_end) in overlaps {
            let Some(at) = cursor else { break };
            if at < claim_start {
                if let Some(gap_end) = claim_start.checked_pred() {
                    free.push((at, gap_end));
                }
            }
            cursor = if claim_end >= record.end {
                None
            } else {
                claim_end.checked_succ()
            };
        }
        if let Some(at) = cursor {
            if at <= record.end {
                free.push((at, record.end));
            }
        }

        for (start, end) in free {
            claimed.insert(start, Range::new(start, end, record.country)?);
        }
    }

    Ok(claimed.into_values().collect())
}

/// Merge adjacent contiguous ranges sharing the same country
fn merge_contiguous<A: Address>(ranges: Vec<Range<A>>) -> Vec<Range<A>> {
    let mut out: Vec<Range<A>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if let Some(prev) = out.last_mut() {
            if prev.country() == range.country()
                && prev.end().checked_succ() == Some(range.start())
            {
                prev.extend_end(range.end());
                continue;
            }
        }
        out.push(range);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn rec(start: u32, end: u32, country: &str) -> RawRecord<Ipv4Addr> {
        RawRecord::new(
            Ipv4Addr::from(start),
            Ipv4Addr::from(end),
            country.parse().unwrap(),
        )
        .unwrap()
    }

    fn bounds(ranges: &[Range<Ipv4Addr>]) -> Vec<(u32, u32, String)> {
        ranges
            .iter()
            .map(|r| {
                (
                    u32::from(r.start()),
                    u32::from(r.end()),
                    r.country().to_string(),
                )
            })
            .collect()
    }

    fn assert_disjoint_sorted(ranges: &[Range<Ipv4Addr>]) {
        for pair in ranges.windows(2) {
            assert!(pair[0].end() < pair[1].start());
        }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let empty: Vec<RawRecord<Ipv4Addr>> = Vec::new();
        assert!(matches!(
            normalize(empty, OverlapPolicy::FirstWins),
            Err(AtlasError::EmptyInput)
        ));
    }

    #[test]
    fn test_first_wins_clips_later_record() {
        let out = normalize(
            vec![rec(1, 100, "US"), rec(50, 150, "CA")],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        assert_eq!(
            bounds(&out),
            vec![(1, 100, "US".to_string()), (101, 150, "CA".to_string())]
        );
    }

    #[test]
    fn test_subset_record_is_dropped() {
        let out = normalize(
            vec![rec(1, 100, "US"), rec(20, 40, "CA")],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        assert_eq!(bounds(&out), vec![(1, 100, "US".to_string())]);
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let out = normalize(
            vec![rec(200, 300, "SE"), rec(1, 100, "US")],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        assert_eq!(
            bounds(&out),
            vec![(1, 100, "US".to_string()), (200, 300, "SE".to_string())]
        );
    }

    #[test]
    fn test_tie_break_shorter_range_first() {
        // Same start: the shorter record sorts first and wins the prefix
        let out = normalize(
            vec![rec(1, 100, "US"), rec(1, 10, "CA")],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        assert_eq!(
            bounds(&out),
            vec![(1, 10, "CA".to_string()), (11, 100, "US".to_string())]
        );
    }

    #[test]
    fn test_merge_contiguous_same_country() {
        let out = normalize(
            vec![rec(1, 50, "US"), rec(51, 100, "US")],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        assert_eq!(bounds(&out), vec![(1, 100, "US".to_string())]);
    }

    #[test]
    fn test_no_merge_across_countries_or_gaps() {
        let out = normalize(
            vec![rec(1, 50, "US"), rec(51, 100, "CA"), rec(102, 150, "CA")],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        assert_eq!(
            bounds(&out),
            vec![
                (1, 50, "US".to_string()),
                (51, 100, "CA".to_string()),
                (102, 150, "CA".to_string())
            ]
        );
    }

    #[test]
    fn test_reject_policy_errors_on_overlap() {
        let result = normalize(
            vec![rec(1, 100, "US"), rec(50, 150, "CA")],
            OverlapPolicy::Reject,
        );
        assert!(matches!(result, Err(AtlasError::OverlappingRecords(_))));

        // Disjoint input passes
        let ok = normalize(
            vec![rec(1, 100, "US"), rec(101, 150, "CA")],
            OverlapPolicy::Reject,
        )
        .unwrap();
        assert_disjoint_sorted(&ok);
    }

    #[test]
    fn test_most_specific_wins_carves_island() {
        // The /8-ish blanket arrives first in input order, but the small
        // claim still wins its slice
        let out = normalize(
            vec![rec(0, 255, "US"), rec(10, 20, "CA")],
            OverlapPolicy::MostSpecificWins,
        )
        .unwrap();
        assert_eq!(
            bounds(&out),
            vec![
                (0, 9, "US".to_string()),
                (10, 20, "CA".to_string()),
                (21, 255, "US".to_string())
            ]
        );
        assert_disjoint_sorted(&out);
    }

    #[test]
    fn test_most_specific_wins_multiple_islands() {
        let out = normalize(
            vec![rec(0, 100, "US"), rec(10, 19, "CA"), rec(30, 39, "SE")],
            OverlapPolicy::MostSpecificWins,
        )
        .unwrap();
        assert_eq!(
            bounds(&out),
            vec![
                (0, 9, "US".to_string()),
                (10, 19, "CA".to_string()),
                (20, 29, "US".to_string()),
                (30, 39, "SE".to_string()),
                (40, 100, "US".to_string())
            ]
        );
    }

    #[test]
    fn test_idempotent() {
        let once = normalize(
            vec![rec(1, 100, "US"), rec(50, 150, "CA"), rec(200, 210, "SE")],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        let records: Vec<RawRecord<Ipv4Addr>> = once
            .iter()
            .map(|r| RawRecord::new(r.start(), r.end(), r.country()).unwrap())
            .collect();
        let twice = normalize(records, OverlapPolicy::FirstWins).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_frontier_at_family_maximum() {
        // A record already covering the family maximum leaves nothing for a
        // later overlapping record to claim
        let out = normalize(
            vec![
                rec(u32::MAX - 10, u32::MAX, "US"),
                rec(u32::MAX - 5, u32::MAX, "CA"),
            ],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        assert_eq!(
            bounds(&out),
            vec![(u32::MAX - 10, u32::MAX, "US".to_string())]
        );
    }

    #[test]
    fn test_sentinel_country_survives_normalization() {
        let out = normalize(
            vec![rec(1, 10, "US"), rec(11, 20, "??")],
            OverlapPolicy::FirstWins,
        )
        .unwrap();
        assert_eq!(out[1].country(), CountryCode::Unassigned);
    }
}

//! Merging the diffs of two mates into one corroborated set.
//!
//! ## Policy
//!
//! Each mate's covered span is the reference range between its left and
//! right missing boundaries. The spans select the policy:
//!
//! | Spans | Retained diffs | Coverage |
//! |-------|----------------|----------|
//! | identical | diffs seen in both mates | the shared span |
//! | disjoint | every diff of either mate | both spans |
//! | partial overlap | shared diffs, plus single-mate diffs where only one mate has coverage | the union span |
//!
//! Wherever both mates cover a position, a diff must be observed by both
//! before it is accepted. This suppresses single-read sequencing and
//! alignment errors while keeping signal that only one mate can reach.

use std::collections::HashSet;

use crate::core::types::{CoverageInterval, DiffEvent, Interval, MissingRange};
use crate::engine::error::ShapeError;
use crate::engine::extract::ReadDiffs;

/// Diffs and coverage of one merged fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDiffs {
    pub diffs: Vec<DiffEvent>,
    /// One interval, or two when the mates do not overlap
    pub coverage: Vec<CoverageInterval>,
}

/// Reduce a read's missing ranges to its covered span `[lo, hi)`.
///
/// The left boundary is the first range when it starts at 0 and the right
/// boundary is the last range when it ends at `genome_length`. A lone range
/// touching both ends counts as a left boundary, leaving an empty span.
/// Internal low-confidence ranges do not shrink the span.
///
/// # Errors
///
/// Returns `ShapeError::OutOfBounds` for an inverted range or one past the
/// genome end, and `ShapeError::CrossedBoundaries` when the boundaries
/// overlap.
pub fn covered_span(
    missing: &[MissingRange],
    genome_length: usize,
) -> Result<Interval, ShapeError> {
    if let Some(range) = missing
        .iter()
        .find(|r| r.start > r.end || r.end > genome_length)
    {
        return Err(ShapeError::OutOfBounds {
            range: *range,
            genome_length,
        });
    }

    let left = missing.first().filter(|r| r.start == 0);
    let right = missing
        .last()
        .filter(|r| r.end == genome_length && (missing.len() > 1 || left.is_none()));

    let lo = left.map_or(0, |r| r.end);
    let hi = right.map_or(genome_length, |r| r.start);

    if lo > hi {
        return Err(ShapeError::CrossedBoundaries { lo, hi });
    }

    Ok(Interval::new(lo, hi))
}

/// Merge the diffs of two mates.
///
/// Retained diffs keep the first mate's order, followed by diffs only the
/// second mate carries.
///
/// # Errors
///
/// Returns a `ShapeError` if either mate's missing ranges cannot be reduced
/// to a covered span.
pub fn merge_pair(
    mate1: &ReadDiffs,
    mate2: &ReadDiffs,
    genome_length: usize,
) -> Result<MergedDiffs, ShapeError> {
    let span1 = covered_span(&mate1.missing, genome_length)?;
    let span2 = covered_span(&mate2.missing, genome_length)?;

    if span1 == span2 {
        return Ok(MergedDiffs {
            diffs: shared_diffs(&mate1.diffs, &mate2.diffs),
            coverage: vec![span1],
        });
    }

    if span1.is_disjoint(&span2) {
        return Ok(MergedDiffs {
            diffs: all_diffs(&mate1.diffs, &mate2.diffs),
            coverage: vec![span1, span2],
        });
    }

    let union = span1.hull(&span2);
    let overlap = span1.intersection(&span2);

    let mut diffs = shared_diffs(&mate1.diffs, &mate2.diffs);
    let shared: HashSet<&DiffEvent> = diffs.iter().collect();
    let single: Vec<DiffEvent> = all_diffs(&mate1.diffs, &mate2.diffs)
        .into_iter()
        .filter(|d| !shared.contains(d))
        .filter(|d| union.contains(d.pos()) && !overlap.contains(d.pos()))
        .collect();
    diffs.extend(single);

    Ok(MergedDiffs {
        diffs,
        coverage: vec![union],
    })
}

/// Diffs of `a` that also occur in `b`, without duplicates
fn shared_diffs(a: &[DiffEvent], b: &[DiffEvent]) -> Vec<DiffEvent> {
    let in_b: HashSet<&DiffEvent> = b.iter().collect();
    let mut seen = HashSet::new();
    a.iter()
        .filter(|d| in_b.contains(d) && seen.insert(*d))
        .cloned()
        .collect()
}

/// Every diff of `a` then `b`, without duplicates
fn all_diffs(a: &[DiffEvent], b: &[DiffEvent]) -> Vec<DiffEvent> {
    let mut seen = HashSet::new();
    a.iter()
        .chain(b)
        .filter(|d| seen.insert(*d))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENOME: usize = 29_903;

    fn mate(diffs: Vec<DiffEvent>, missing: Vec<Interval>) -> ReadDiffs {
        ReadDiffs {
            qname: "frag".to_string(),
            diffs,
            missing,
            query_consumed: 0,
            ref_end: 0,
        }
    }

    fn sub(pos: usize, nt: char) -> DiffEvent {
        DiffEvent::Substitution { pos, nt }
    }

    #[test]
    fn test_covered_span_from_boundaries() {
        let missing = vec![
            Interval::new(0, 10),
            Interval::new(50, 51),
            Interval::new(90, 100),
        ];
        assert_eq!(covered_span(&missing, 100).unwrap(), Interval::new(10, 90));

        // Read starting at 0 with an internal low-quality base
        let missing = vec![Interval::new(50, 51), Interval::new(90, 100)];
        assert_eq!(covered_span(&missing, 100).unwrap(), Interval::new(0, 90));

        assert_eq!(covered_span(&[], 100).unwrap(), Interval::new(0, 100));
    }

    #[test]
    fn test_covered_span_single_boundary() {
        assert_eq!(
            covered_span(&[Interval::new(0, 40)], 100).unwrap(),
            Interval::new(40, 100)
        );
        assert_eq!(
            covered_span(&[Interval::new(60, 100)], 100).unwrap(),
            Interval::new(0, 60)
        );
        // Nothing aligned: the lone range is the left boundary
        assert_eq!(
            covered_span(&[Interval::new(0, 100)], 100).unwrap(),
            Interval::new(100, 100)
        );
    }

    #[test]
    fn test_covered_span_shape_errors() {
        assert_eq!(
            covered_span(&[Interval::new(0, 120)], 100),
            Err(ShapeError::OutOfBounds {
                range: Interval::new(0, 120),
                genome_length: 100
            })
        );
        assert_eq!(
            covered_span(&[Interval::new(0, 60), Interval::new(40, 100)], 100),
            Err(ShapeError::CrossedBoundaries { lo: 60, hi: 40 })
        );
    }

    #[test]
    fn test_identical_mates_are_idempotent() {
        let diffs = vec![sub(100, 'T'), DiffEvent::Deletion { pos: 500, length: 3 }];
        let missing = vec![Interval::new(0, 50), Interval::new(600, GENOME)];
        let m = mate(diffs.clone(), missing);

        let merged = merge_pair(&m, &m.clone(), GENOME).unwrap();
        assert_eq!(merged.diffs, diffs);
        assert_eq!(merged.coverage, vec![Interval::new(50, 600)]);
    }

    #[test]
    fn test_identical_spans_reject_uncorroborated_diff() {
        let m1 = mate(vec![DiffEvent::Deletion { pos: 500, length: 3 }], vec![]);
        let m2 = mate(vec![], vec![]);

        let merged = merge_pair(&m1, &m2, GENOME).unwrap();
        assert!(merged.diffs.is_empty());
        assert_eq!(merged.coverage, vec![Interval::new(0, GENOME)]);
    }

    #[test]
    fn test_disjoint_spans_keep_everything() {
        let m1 = mate(vec![sub(100, 'T')], vec![Interval::new(10_000, GENOME)]);
        let m2 = mate(vec![], vec![Interval::new(0, 20_000)]);

        let merged = merge_pair(&m1, &m2, GENOME).unwrap();
        assert_eq!(merged.diffs, vec![sub(100, 'T')]);
        assert_eq!(
            merged.coverage,
            vec![Interval::new(0, 10_000), Interval::new(20_000, GENOME)]
        );
    }

    #[test]
    fn test_abutting_spans_are_disjoint() {
        let m1 = mate(vec![sub(5, 'A')], vec![Interval::new(10, 100)]);
        let m2 = mate(vec![sub(15, 'C')], vec![Interval::new(0, 10)]);

        let merged = merge_pair(&m1, &m2, 100).unwrap();
        assert_eq!(merged.diffs, vec![sub(5, 'A'), sub(15, 'C')]);
        assert_eq!(merged.coverage.len(), 2);
    }

    #[test]
    fn test_partial_overlap_requires_corroboration_in_overlap() {
        // mate1 covers [0, 200), mate2 covers [100, 300)
        let m1 = mate(
            vec![sub(50, 'A'), sub(120, 'G'), sub(150, 'C')],
            vec![Interval::new(200, 1000)],
        );
        let m2 = mate(
            vec![sub(120, 'G'), DiffEvent::Deletion { pos: 250, length: 2 }],
            vec![Interval::new(0, 100), Interval::new(300, 1000)],
        );

        let merged = merge_pair(&m1, &m2, 1000).unwrap();
        assert_eq!(
            merged.diffs,
            vec![
                sub(120, 'G'),
                sub(50, 'A'),
                DiffEvent::Deletion { pos: 250, length: 2 },
            ]
        );
        assert_eq!(merged.coverage, vec![Interval::new(0, 300)]);
    }

    #[test]
    fn test_partial_overlap_boundaries_are_half_open() {
        // mate1 covers [0, 200), mate2 covers [100, 300): overlap [100, 200)
        let insertion = DiffEvent::Insertion {
            pos: 300,
            seq: "GA".to_string(),
        };
        let m1 = mate(
            vec![sub(99, 'A'), sub(100, 'C'), sub(199, 'G')],
            vec![Interval::new(200, 1000)],
        );
        let m2 = mate(
            vec![sub(200, 'T'), insertion],
            vec![Interval::new(0, 100), Interval::new(300, 1000)],
        );

        let merged = merge_pair(&m1, &m2, 1000).unwrap();

        // 99 is just left of the overlap, 200 is its exclusive end; 100 and
        // 199 sit on the overlap edges; 300 is the union's exclusive end
        assert_eq!(merged.diffs, vec![sub(99, 'A'), sub(200, 'T')]);
        assert_eq!(merged.coverage, vec![Interval::new(0, 300)]);
    }

    #[test]
    fn test_shape_error_propagates() {
        let good = mate(vec![], vec![]);
        let bad = mate(vec![], vec![Interval::new(5, 2)]);
        assert!(merge_pair(&good, &bad, 100).is_err());
        assert!(merge_pair(&bad, &good, 100).is_err());
    }
}

use serde::Serialize;

use crate::core::types::{CoverageInterval, Interval, MissingRange};

/// Read depth for every reference position of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DepthTable {
    depth: Vec<u32>,
}

impl DepthTable {
    /// A zeroed table covering `genome_length` positions
    #[must_use]
    pub fn new(genome_length: usize) -> Self {
        Self {
            depth: vec![0; genome_length],
        }
    }

    /// Add one read of depth to every position of `interval`.
    ///
    /// Positions past the end of the table are ignored.
    pub fn add(&mut self, interval: &CoverageInterval) {
        let end = interval.end.min(self.depth.len());
        if interval.start >= end {
            return;
        }
        for d in &mut self.depth[interval.start..end] {
            *d = d.saturating_add(1);
        }
    }

    pub fn add_all<'a>(&mut self, intervals: impl IntoIterator<Item = &'a CoverageInterval>) {
        for interval in intervals {
            self.add(interval);
        }
    }

    /// Depth at a 0-indexed position; positions outside the genome have none
    #[must_use]
    pub fn get(&self, pos: usize) -> u32 {
        self.depth.get(pos).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.depth
    }

    /// Number of positions with at least one read
    #[must_use]
    pub fn covered_positions(&self) -> usize {
        self.depth.iter().filter(|&&d| d > 0).count()
    }
}

/// Coverage of a single-end read: the gaps between its missing ranges.
///
/// The genome ends act as empty missing ranges, so a read without a leading
/// or trailing boundary still covers up to the genome edge. Empty gaps
/// between adjacent missing ranges are skipped.
#[must_use]
pub fn single_end_coverage(
    missing: &[MissingRange],
    genome_length: usize,
) -> Vec<CoverageInterval> {
    let start = Interval::new(0, 0);
    let end = Interval::new(genome_length, genome_length);

    let bounds: Vec<&Interval> = std::iter::once(&start)
        .chain(missing)
        .chain(std::iter::once(&end))
        .collect();

    bounds
        .windows(2)
        .map(|w| Interval::new(w[0].end, w[1].start))
        .filter(|gap| !gap.is_empty())
        .collect()
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::types::DiffEvent;
use crate::engine::coverage::DepthTable;
use crate::engine::locator::MutationLocator;

/// Helper function to convert an occurrence count to f64 with explicit precision loss allowance
#[inline]
fn count_to_f64(count: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Normalized frequency of one mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRecord {
    /// 1-indexed reference position
    pub position: usize,

    /// Canonical mutation key, e.g. `~241T` or `-11288.9`
    pub mutation: String,

    /// Label from the mutation locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Sum of 1/depth over every fragment carrying the mutation
    pub frequency: f64,

    /// Read depth at the position
    pub coverage: u32,
}

#[derive(Debug, Clone)]
struct Tally {
    label: Option<String>,
    occurrences: u64,
}

/// Collects retained diffs across a run and normalizes them by read depth.
///
/// Depth is only known once every fragment has been seen, so diffs are
/// tallied first and divided by the final depth when records are produced.
#[derive(Debug, Clone, Default)]
pub struct FrequencyAggregator {
    tallies: BTreeMap<(usize, String), Tally>,
}

impl FrequencyAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fragment's retained diffs.
    ///
    /// The locator is asked for a label the first time a mutation is seen.
    pub fn add<L>(&mut self, diffs: &[DiffEvent], locator: &L)
    where
        L: MutationLocator + ?Sized,
    {
        for diff in diffs {
            self.tallies
                .entry((diff.pos(), diff.key()))
                .or_insert_with(|| Tally {
                    label: locator.locate(diff),
                    occurrences: 0,
                })
                .occurrences += 1;
        }
    }

    /// Number of distinct mutations seen
    #[must_use]
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// Frequencies ordered by position then mutation key.
    ///
    /// Mutations at positions without read depth carry no normalizable
    /// signal and are left out.
    pub fn frequencies<'a>(
        &'a self,
        depth: &'a DepthTable,
    ) -> impl Iterator<Item = FrequencyRecord> + 'a {
        self.tallies.iter().filter_map(move |((pos, key), tally)| {
            let coverage = depth.get(*pos);
            if coverage == 0 {
                return None;
            }
            Some(FrequencyRecord {
                position: pos + 1,
                mutation: key.clone(),
                label: tally.label.clone(),
                frequency: count_to_f64(tally.occurrences) / f64::from(coverage),
                coverage,
            })
        })
    }
}

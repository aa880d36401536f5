//! One processing run over one sample's alignment stream.
//!
//! A [`Run`] owns every piece of per-sample state: the depth table, the
//! mutation tallies and the skip counters. It is created for a single stream
//! and consumed when that stream ends, so nothing leaks between samples.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::read::AlignedRead;
use crate::core::types::{CoverageInterval, DiffEvent, SiteMask};
use crate::engine::coverage::{single_end_coverage, DepthTable};
use crate::engine::error::{CigarError, RecordError, RunError};
use crate::engine::extract::{extract_diffs, ExtractConfig, ReadDiffs};
use crate::engine::frequency::{FrequencyAggregator, FrequencyRecord};
use crate::engine::locator::MutationLocator;
use crate::engine::merge::{covered_span, merge_pair};
use crate::engine::pairing::{ReadPair, ReadPairMatcher};
use crate::parsing::sam::ParseError;

/// Default number of records between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Configuration for a processing run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Per-read extraction settings (genome length, alphabet, quality threshold)
    pub extract: ExtractConfig,
    /// Pair mates by query name; single-end reads are processed one by one
    pub paired: bool,
    /// Stop after this many fragments (pairs, or reads in single-end mode)
    pub max_fragments: Option<usize>,
    /// Log progress every this many records; 0 disables progress logging
    pub progress_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            extract: ExtractConfig::default(),
            paired: true,
            max_fragments: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Counters describing what happened to the records of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Records taken from the alignment stream
    pub records: u64,
    /// Fragments whose diffs and coverage were accumulated
    pub fragments: u64,
    /// Records skipped because their CIGAR could not be walked
    pub skipped_records: u64,
    /// Fragments skipped because their missing ranges were malformed
    pub skipped_pairs: u64,
    /// Reads discarded at the end of the stream without a mate
    pub unpaired: u64,
    /// Diffs dropped because they fall on a masked site
    pub masked_diffs: u64,
}

/// Retained diffs and coverage of one processed fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentDiffs {
    pub qname: String,
    pub diffs: Vec<DiffEvent>,
    pub coverage: Vec<CoverageInterval>,
}

/// Everything a run produced
#[derive(Debug)]
pub struct RunOutput {
    pub depth: DepthTable,
    pub stats: RunStats,
    tallies: FrequencyAggregator,
}

impl RunOutput {
    /// Normalized mutation frequencies ordered by position
    pub fn frequencies(&self) -> impl Iterator<Item = FrequencyRecord> + '_ {
        self.tallies.frequencies(&self.depth)
    }

    /// Number of distinct mutations observed, including uncovered ones
    #[must_use]
    pub fn distinct_mutations(&self) -> usize {
        self.tallies.len()
    }
}

/// Per-sample accumulator driving extraction, merging and aggregation
pub struct Run<'a> {
    config: RunConfig,
    locator: &'a dyn MutationLocator,
    mask: Option<&'a SiteMask>,
    depth: DepthTable,
    tallies: FrequencyAggregator,
    stats: RunStats,
}

impl<'a> Run<'a> {
    pub fn new(config: RunConfig, locator: &'a dyn MutationLocator) -> Self {
        let depth = DepthTable::new(config.extract.genome_length);
        Self {
            config,
            locator,
            mask: None,
            depth,
            tallies: FrequencyAggregator::new(),
            stats: RunStats::default(),
        }
    }

    /// Drop diffs at these reference positions before aggregation
    #[must_use]
    pub fn with_mask(mut self, mask: &'a SiteMask) -> Self {
        self.mask = Some(mask);
        self
    }

    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Extract, merge and accumulate one mate pair.
    ///
    /// # Errors
    ///
    /// Returns a `RecordError` when either mate's CIGAR cannot be walked or
    /// its missing ranges cannot be reduced to a covered span. Nothing is
    /// accumulated in that case.
    pub fn process_pair(&mut self, pair: &ReadPair) -> Result<FragmentDiffs, RecordError> {
        let mate1 = self.extract(&pair.first)?;
        let mate2 = self.extract(&pair.second)?;
        let merged = merge_pair(&mate1, &mate2, self.config.extract.genome_length)?;

        Ok(self.accumulate(&pair.first.qname, merged.diffs, merged.coverage))
    }

    /// Extract and accumulate a single-end read.
    ///
    /// Every diff is kept; coverage is the stretch between consecutive
    /// missing ranges.
    ///
    /// # Errors
    ///
    /// Returns a `RecordError` when the CIGAR cannot be walked or the missing
    /// ranges fall outside the genome.
    pub fn process_single(&mut self, read: &AlignedRead) -> Result<FragmentDiffs, RecordError> {
        let genome_length = self.config.extract.genome_length;
        let extracted = self.extract(read)?;
        covered_span(&extracted.missing, genome_length)?;
        let coverage = single_end_coverage(&extracted.missing, genome_length);

        Ok(self.accumulate(&read.qname, extracted.diffs, coverage))
    }

    fn extract(&self, read: &AlignedRead) -> Result<ReadDiffs, CigarError> {
        let extracted = extract_diffs(read, &self.config.extract)?;
        if extracted.query_consumed != read.sequence.len() && !read.sequence.is_empty() {
            debug!(
                qname = %read.qname,
                cigar = %read.cigar,
                consumed = extracted.query_consumed,
                length = read.sequence.len(),
                "CIGAR does not consume the whole read"
            );
        }
        Ok(extracted)
    }

    fn accumulate(
        &mut self,
        qname: &str,
        mut diffs: Vec<DiffEvent>,
        coverage: Vec<CoverageInterval>,
    ) -> FragmentDiffs {
        if let Some(mask) = self.mask {
            let before = diffs.len();
            diffs.retain(|d| !mask.masks(d));
            self.stats.masked_diffs += (before - diffs.len()) as u64;
        }

        self.depth.add_all(&coverage);
        self.tallies.add(&diffs, self.locator);
        self.stats.fragments += 1;

        FragmentDiffs {
            qname: qname.to_string(),
            diffs,
            coverage,
        }
    }

    fn record_skip(&mut self, qname: &str, error: &RecordError) {
        match error {
            RecordError::Cigar(_) => self.stats.skipped_records += 1,
            RecordError::Shape(_) => self.stats.skipped_pairs += 1,
        }
        warn!(qname = %qname, error = %error, "Skipping fragment");
    }

    fn log_progress(&self) {
        let interval = self.config.progress_interval;
        if interval > 0 && self.stats.records % interval == 0 {
            info!(
                records = self.stats.records,
                fragments = self.stats.fragments,
                "Processed alignment records"
            );
        }
    }

    /// Consume an alignment stream and return the accumulated results.
    ///
    /// `on_fragment` sees every fragment right after it is accumulated.
    /// Records that fail extraction or merging are skipped and counted.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Stream` when the stream itself fails; the error
    /// carries everything accumulated up to that point.
    pub fn process_stream<I, F>(mut self, records: I, mut on_fragment: F) -> Result<RunOutput, RunError>
    where
        I: IntoIterator<Item = Result<AlignedRead, ParseError>>,
        F: FnMut(&FragmentDiffs),
    {
        let mut matcher = ReadPairMatcher::new();
        let mut taken = 0usize;

        for result in records {
            if self.config.max_fragments.is_some_and(|max| taken >= max) {
                info!(fragments = taken, "Fragment limit reached");
                break;
            }

            let read = match result {
                Ok(read) => read,
                Err(source) => {
                    self.stats.unpaired += matcher.finish() as u64;
                    return Err(RunError::Stream {
                        source,
                        partial: Box::new(self.finish()),
                    });
                }
            };

            self.stats.records += 1;
            self.log_progress();

            let (qname, outcome) = if self.config.paired {
                let Some(pair) = matcher.push(read) else {
                    continue;
                };
                (pair.first.qname.clone(), self.process_pair(&pair))
            } else {
                (read.qname.clone(), self.process_single(&read))
            };
            taken += 1;

            match outcome {
                Ok(fragment) => on_fragment(&fragment),
                Err(e) => self.record_skip(&qname, &e),
            }
        }

        self.stats.unpaired += matcher.finish() as u64;
        Ok(self.finish())
    }

    /// Close the run and hand back its results
    #[must_use]
    pub fn finish(self) -> RunOutput {
        let stats = &self.stats;
        if stats.skipped_records > 0 || stats.skipped_pairs > 0 {
            warn!(
                skipped_records = stats.skipped_records,
                skipped_pairs = stats.skipped_pairs,
                "Some records could not be processed"
            );
        }
        if stats.unpaired > 0 {
            warn!(unpaired = stats.unpaired, "Reads without a mate were discarded");
        }

        RunOutput {
            depth: self.depth,
            stats: self.stats,
            tallies: self.tallies,
        }
    }
}

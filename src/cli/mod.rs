//! Command-line interface for ww-mutfreq.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **frequencies**: Compute per-mutation frequencies and read depth for one sample
//! - **diffs**: Dump the merged diffs of every fragment
//!
//! ## Usage
//!
//! ```text
//! # Frequencies from a paired-end SAM, labelled against the reference
//! ww-mutfreq frequencies sample.sam.gz --reference NC_045512.fa \
//!     --output sample.mutations.csv --coverage-output sample.coverage.csv
//!
//! # Stream straight from the aligner
//! minimap2 -ax sr --eqx ref.fa R1.fq R2.fq | ww-mutfreq frequencies - --format json
//!
//! # Nanopore reads are single-end
//! ww-mutfreq frequencies ont.bam --single-end --format tsv
//!
//! # Inspect what each fragment contributed
//! ww-mutfreq diffs sample.sam --limit 100
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::core::reference::{ReferenceGenome, DEFAULT_GENOME_LENGTH};
use crate::core::types::SiteMask;
use crate::engine::error::RunError;
use crate::engine::extract::{ExtractConfig, DEFAULT_ALPHABET, DEFAULT_MIN_QUALITY};
use crate::engine::locator::{MutationLocator, NoLabels, NucleotideLocator};
use crate::engine::run::{FragmentDiffs, Run, RunConfig, RunOutput, DEFAULT_PROGRESS_INTERVAL};
use crate::parsing;
use crate::parsing::sam::AlignmentReader;
use crate::utils::validation::{normalize_alphabet, validate_genome_length};

pub mod diffs;
pub mod frequencies;

#[derive(Parser)]
#[command(name = "ww-mutfreq")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Mutation frequencies and read depth from wastewater sequencing alignments")]
#[command(
    long_about = "ww-mutfreq turns aligned reads into per-mutation frequencies.\n\nEach read's CIGAR is walked into substitutions, insertions and deletions. Mates of a fragment are merged so that wherever both cover a position a mutation must be seen by both, and every retained mutation is normalized by the read depth at its position.\n\nAlign with extended CIGARs (e.g. minimap2 --eqx) so mismatches are reported as X operations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute mutation frequencies and read depth
    Frequencies(frequencies::FrequenciesArgs),

    /// Print the merged diffs of every fragment
    Diffs(diffs::DiffsArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
    Csv,
}

impl OutputFormat {
    /// Field delimiter for delimited formats
    #[must_use]
    pub fn delimiter(self) -> Option<u8> {
        match self {
            Self::Tsv => Some(b'\t'),
            Self::Csv => Some(b','),
            Self::Text | Self::Json => None,
        }
    }
}

/// Input and engine options shared by every subcommand
#[derive(Args)]
pub struct RunArgs {
    /// Alignment file (SAM, SAM.gz or BAM). Use '-' for SAM on stdin
    #[arg(required = true)]
    pub input: PathBuf,

    /// Reference FASTA; sets the genome length and enables nucleotide labels
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Reference genome length (defaults to the reference, or 29903 without one)
    #[arg(long)]
    pub genome_length: Option<usize>,

    /// Nucleotides accepted as substitutions
    #[arg(long, default_value = DEFAULT_ALPHABET)]
    pub alphabet: String,

    /// Minimum Phred quality for a mismatched base to count as a substitution
    #[arg(short = 'q', long, default_value_t = DEFAULT_MIN_QUALITY)]
    pub min_quality: u8,

    /// Treat every read as its own fragment (e.g. nanopore data)
    #[arg(long)]
    pub single_end: bool,

    /// Stop after this many fragments
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// VCF of problematic sites whose diffs are ignored
    #[arg(long)]
    pub mask_vcf: Option<PathBuf>,

    /// Only mask VCF records with this FILTER value (e.g. 'mask')
    #[arg(long, requires = "mask_vcf")]
    pub mask_filter: Option<String>,

    /// Log progress every this many records (0 disables)
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: u64,
}

/// Everything loaded from the command line before reads are streamed
pub struct Prepared {
    pub reference: Option<ReferenceGenome>,
    pub mask: Option<SiteMask>,
    pub config: RunConfig,
}

impl Prepared {
    /// Nucleotide labels with a reference, none without
    #[must_use]
    pub fn locator(&self) -> Box<dyn MutationLocator + '_> {
        match &self.reference {
            Some(reference) => Box::new(NucleotideLocator::new(reference)),
            None => Box::new(NoLabels),
        }
    }
}

impl RunArgs {
    /// Load the reference and mask and build the run configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the reference or mask cannot be read, the
    /// alphabet is invalid, or the genome length conflicts with the reference.
    pub fn prepare(&self) -> anyhow::Result<Prepared> {
        let reference = self
            .reference
            .as_deref()
            .map(parsing::fasta::load_reference)
            .transpose()
            .context("Failed to load reference FASTA")?;

        let genome_length = match (&reference, self.genome_length) {
            (Some(reference), Some(length)) if reference.len() != length => bail!(
                "--genome-length {length} does not match reference '{}' of length {}",
                reference.name,
                reference.len()
            ),
            (Some(reference), _) => reference.len(),
            (None, Some(length)) => length,
            (None, None) => DEFAULT_GENOME_LENGTH,
        };
        let genome_length = validate_genome_length(genome_length)?;
        let alphabet = normalize_alphabet(&self.alphabet)?;

        let mask = self
            .mask_vcf
            .as_deref()
            .map(|path| parsing::vcf::parse_mask_file(path, self.mask_filter.as_deref()))
            .transpose()
            .context("Failed to load problematic-site VCF")?;

        if let Some(mask) = &mask {
            info!(positions = mask.len(), "Masking problematic sites");
        }

        let config = RunConfig {
            extract: ExtractConfig {
                genome_length,
                alphabet,
                min_quality: self.min_quality,
            },
            paired: !self.single_end,
            max_fragments: self.limit,
            progress_interval: self.progress_interval,
        };

        Ok(Prepared {
            reference,
            mask,
            config,
        })
    }
}

/// Stream the input through a run
///
/// Returns the run output and the number of records the reader filtered out.
///
/// # Errors
///
/// Returns an error if the input cannot be opened or the stream fails part
/// way. With `allow_truncated` a failed stream is logged and the partial
/// results are returned instead.
pub fn execute<F>(
    args: &RunArgs,
    prepared: &Prepared,
    allow_truncated: bool,
    on_fragment: F,
) -> anyhow::Result<(RunOutput, u64)>
where
    F: FnMut(&FragmentDiffs),
{
    let mut reader = AlignmentReader::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;

    let locator = prepared.locator();
    let mut run = Run::new(prepared.config.clone(), locator.as_ref());
    if let Some(mask) = &prepared.mask {
        run = run.with_mask(mask);
    }

    let output = match run.process_stream(reader.by_ref(), on_fragment) {
        Ok(output) => output,
        Err(RunError::Stream { source, partial }) if allow_truncated => {
            tracing::error!(
                error = %source,
                fragments = partial.stats.fragments,
                "Alignment stream failed, keeping results accumulated so far"
            );
            *partial
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", args.input.display()));
        }
    };

    Ok((output, reader.filtered()))
}

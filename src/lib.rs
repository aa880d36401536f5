//! # ww-mutfreq
//!
//! A library for measuring mutation frequencies in wastewater sequencing data.
//!
//! Wastewater samples hold a mixture of viral lineages, so rather than
//! calling a consensus this crate reports how often every mutation is seen
//! relative to the read depth at its position.
//!
//! ## Features
//!
//! - **CIGAR diff extraction**: Substitutions, insertions and deletions from
//!   extended CIGAR strings, with low-quality and ambiguous bases marked missing
//! - **Mate corroboration**: Where both mates of a fragment cover a position,
//!   a mutation must be seen by both
//! - **Depth normalization**: Frequencies are counts divided by fragment depth
//! - **Problematic-site masking**: Diffs at known artefact positions are dropped
//! - **Pluggable labels**: Any [`MutationLocator`] can name mutations
//!
//! ## Example
//!
//! ```rust
//! use ww_mutfreq::{AlignedRead, NoLabels, Run, RunConfig};
//!
//! let reads = vec![
//!     AlignedRead::new("frag1", 0, "3=1X", "ACGA", "IIII"),
//!     AlignedRead::new("frag1", 0, "3=1X", "ACGA", "IIII"),
//! ];
//!
//! let mut config = RunConfig::default();
//! config.extract.genome_length = 4;
//!
//! let output = Run::new(config, &NoLabels)
//!     .process_stream(reads.into_iter().map(Ok), |_| {})
//!     .unwrap();
//!
//! for record in output.frequencies() {
//!     println!("{} {:.3}", record.mutation, record.frequency);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Reads, diffs, intervals and the reference genome
//! - [`engine`]: Extraction, pairing, merging and frequency aggregation
//! - [`parsing`]: SAM/BAM, FASTA and VCF readers
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod engine;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::core::read::AlignedRead;
pub use crate::core::reference::ReferenceGenome;
pub use crate::core::types::*;
pub use crate::engine::error::{CigarError, RecordError, RunError, ShapeError};
pub use crate::engine::frequency::FrequencyRecord;
pub use crate::engine::locator::{MutationLocator, NoLabels, NucleotideLocator};
pub use crate::engine::run::{Run, RunConfig, RunOutput, RunStats};

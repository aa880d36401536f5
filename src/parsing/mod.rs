//! Readers for the files a run consumes.
//!
//! - **SAM/BAM**: aligned reads streamed into the engine ([`sam`])
//! - **FASTA**: the reference genome ([`fasta`])
//! - **VCF**: problematic sites whose diffs are masked ([`vcf`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use ww_mutfreq::parsing::fasta::load_reference;
//! use ww_mutfreq::parsing::sam::AlignmentReader;
//! use std::path::Path;
//!
//! let reference = load_reference(Path::new("NC_045512.fa")).unwrap();
//! let reader = AlignmentReader::open(Path::new("sample.sam.gz")).unwrap();
//! for read in reader {
//!     let read = read.unwrap();
//!     println!("{} {} {}", read.qname, read.ref_start, read.cigar);
//! }
//! # let _ = reference;
//! ```
//!
//! ## Coordinates
//!
//! | Source | Field | Convention |
//! |--------|-------|------------|
//! | SAM | POS | 1-indexed, converted to 0-indexed |
//! | BAM | pos | 0-indexed on disk, exposed 1-indexed by noodles, converted |
//! | VCF | POS | 1-indexed, converted to 0-indexed |

pub mod fasta;
pub mod sam;
pub mod vcf;

//! Core data types for diff extraction and frequency estimation.
//!
//! - [`AlignedRead`](read::AlignedRead): one aligned read with its CIGAR, bases and qualities
//! - [`DiffEvent`](types::DiffEvent): a substitution, insertion or deletion relative to the reference
//! - [`Interval`](types::Interval): half-open reference range used for missing data and coverage
//! - [`ReferenceGenome`](reference::ReferenceGenome): the reference sequence reads were aligned to
//!
//! ## Coordinates
//!
//! Every position held by these types is a 0-indexed reference coordinate.
//! Conversion to 1-indexed positions happens only when mutation keys and
//! output records are produced.

pub mod read;
pub mod reference;
pub mod types;

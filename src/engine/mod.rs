//! Diff extraction, mate merging and frequency aggregation.
//!
//! The stages run in stream order for every fragment:
//!
//! 1. [`extract`] walks each read's CIGAR into diffs and missing ranges
//! 2. [`pairing`] matches mates by query name
//! 3. [`merge`] keeps the diffs both mates agree on where both have coverage
//! 4. [`coverage`] adds the fragment's coverage to the depth table
//! 5. [`frequency`] divides mutation counts by depth once the stream ends
//!
//! [`run::Run`] owns the per-sample state and drives the stages.

pub mod coverage;
pub mod error;
pub mod extract;
pub mod frequency;
pub mod locator;
pub mod merge;
pub mod pairing;
pub mod run;

use thiserror::Error;

use crate::core::types::Interval;
use crate::engine::run::RunOutput;
use crate::parsing::sam::ParseError;

/// A CIGAR string that cannot be walked against its read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CigarError {
    #[error("unrecognized CIGAR operator '{op}' in '{cigar}'")]
    UnknownOperator { op: char, cigar: String },

    #[error("missing or invalid operation length in CIGAR '{0}'")]
    MalformedLength(String),

    #[error("CIGAR '{cigar}' consumes {needed} query bases but the read has {available}")]
    QueryOverrun {
        cigar: String,
        needed: usize,
        available: usize,
    },

    #[error("CIGAR '{cigar}' moves the reference cursor past the addressable range")]
    ReferenceOverrun { cigar: String },
}

/// Missing ranges that cannot be reduced to a left and right boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("missing range {range} is inverted or extends past genome length {genome_length}")]
    OutOfBounds {
        range: Interval,
        genome_length: usize,
    },

    #[error("left boundary ends at {lo} after right boundary starts at {hi}")]
    CrossedBoundaries { lo: usize, hi: usize },
}

/// Why a single record or fragment was skipped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error(transparent)]
    Cigar(#[from] CigarError),

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Failure that ends a whole run
#[derive(Error, Debug)]
pub enum RunError {
    /// The alignment stream failed. Everything computed before the failure is
    /// kept in `partial`.
    #[error("alignment stream failed: {source}")]
    Stream {
        #[source]
        source: ParseError,
        partial: Box<RunOutput>,
    },
}

impl RunError {
    /// Results accumulated before the run failed
    #[must_use]
    pub fn into_partial(self) -> RunOutput {
        match self {
            Self::Stream { partial, .. } => *partial,
        }
    }
}

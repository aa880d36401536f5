use std::collections::HashMap;

use tracing::debug;

use crate::core::read::AlignedRead;

/// Two reads sharing a query name, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPair {
    pub first: AlignedRead,
    pub second: AlignedRead,
}

/// Pairs mates from a sequential record stream.
///
/// Memory is bounded by the number of query names currently waiting for a
/// mate, not by the total number of reads.
#[derive(Debug, Default)]
pub struct ReadPairMatcher {
    pending: HashMap<String, AlignedRead>,
}

impl ReadPairMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the next record.
    ///
    /// Returns the completed pair when this record's mate is already pending,
    /// otherwise holds the record until its mate arrives.
    pub fn push(&mut self, read: AlignedRead) -> Option<ReadPair> {
        if let Some(first) = self.pending.remove(&read.qname) {
            return Some(ReadPair {
                first,
                second: read,
            });
        }
        self.pending.insert(read.qname.clone(), read);
        None
    }

    /// Number of reads waiting for a mate
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop every read still waiting for its mate and return how many there were
    pub fn finish(&mut self) -> usize {
        let discarded = self.pending.len();
        if discarded > 0 {
            debug!(discarded, "Discarding reads without a mate");
        }
        self.pending.clear();
        discarded
    }
}

/// Lazily pair the mates of a record stream.
///
/// Unmatched reads left at the end of the stream are dropped.
pub fn pair_reads<I>(reads: I) -> impl Iterator<Item = ReadPair>
where
    I: IntoIterator<Item = AlignedRead>,
{
    let mut matcher = ReadPairMatcher::new();
    reads.into_iter().filter_map(move |read| matcher.push(read))
}

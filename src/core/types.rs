use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A half-open reference interval `[start, end)`.
///
/// Used both for ranges without a confident base call ("missing" ranges) and
/// for the coverage intervals that contribute read depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True if `pos` lies inside the half-open interval
    #[must_use]
    pub const fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// True if the two intervals share no position
    #[must_use]
    pub const fn is_disjoint(&self, other: &Interval) -> bool {
        self.end <= other.start || other.end <= self.start
    }

    /// Smallest interval spanning both
    #[must_use]
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Positions shared by both (may be empty)
    #[must_use]
    pub fn intersection(&self, other: &Interval) -> Interval {
        Interval::new(self.start.max(other.start), self.end.min(other.end))
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A reference range without a confident base call
pub type MissingRange = Interval;

/// A reference range contributing +1 read depth per position
pub type CoverageInterval = Interval;

/// A single difference between a read and the reference genome.
///
/// All positions are 0-indexed reference coordinates. Insertions are placed
/// at the reference position immediately after the inserted bases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiffEvent {
    Substitution { pos: usize, nt: char },
    Insertion { pos: usize, seq: String },
    Deletion { pos: usize, length: usize },
}

impl DiffEvent {
    /// 0-indexed reference position of the event
    #[must_use]
    pub fn pos(&self) -> usize {
        match self {
            Self::Substitution { pos, .. }
            | Self::Insertion { pos, .. }
            | Self::Deletion { pos, .. } => *pos,
        }
    }

    /// Single-character event marker: `~` substitution, `+` insertion, `-` deletion
    #[must_use]
    pub fn marker(&self) -> char {
        match self {
            Self::Substitution { .. } => '~',
            Self::Insertion { .. } => '+',
            Self::Deletion { .. } => '-',
        }
    }

    /// Event payload as text: new base, inserted sequence, or deletion length
    #[must_use]
    pub fn payload(&self) -> String {
        match self {
            Self::Substitution { nt, .. } => nt.to_string(),
            Self::Insertion { seq, .. } => seq.clone(),
            Self::Deletion { length, .. } => length.to_string(),
        }
    }

    /// Canonical mutation key with a 1-indexed position.
    ///
    /// Substitutions are `~{pos}{nt}`; indels carry a `.` separator before
    /// the payload, e.g. `+{pos}.{seq}` and `-{pos}.{length}`.
    #[must_use]
    pub fn key(&self) -> String {
        let pos = self.pos() + 1;
        let (marker, payload) = (self.marker(), self.payload());
        match self {
            Self::Substitution { .. } => format!("{marker}{pos}{payload}"),
            Self::Insertion { .. } | Self::Deletion { .. } => format!("{marker}{pos}.{payload}"),
        }
    }
}

impl std::fmt::Display for DiffEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Reference positions whose diffs are ignored (e.g. known problematic sites)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteMask {
    positions: BTreeSet<usize>,
}

impl SiteMask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask every position of a half-open interval
    pub fn insert_range(&mut self, range: Interval) {
        self.positions.extend(range.start..range.end);
    }

    #[must_use]
    pub fn contains(&self, pos: usize) -> bool {
        self.positions.contains(&pos)
    }

    /// True if the diff sits on a masked position
    #[must_use]
    pub fn masks(&self, diff: &DiffEvent) -> bool {
        self.contains(diff.pos())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<usize> for SiteMask {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

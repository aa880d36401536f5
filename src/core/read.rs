use serde::{Deserialize, Serialize};

/// SAM flag bit for an unmapped segment
pub const FLAG_UNMAPPED: u16 = 0x4;

/// SAM flag bit for a supplementary alignment
pub const FLAG_SUPPLEMENTARY: u16 = 0x800;

/// Reference name used by SAM for records without a mapping
pub const UNMAPPED_REFERENCE: &str = "*";

/// One aligned read as handed to the diff engine.
///
/// `ref_start` is 0-indexed; producers convert from the 1-indexed SAM `POS`.
/// `quality` holds the raw Phred+33 bytes and is empty when the record had
/// no base qualities (`*` in SAM).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedRead {
    pub qname: String,
    pub flags: u16,
    pub reference_name: String,
    pub ref_start: usize,
    pub cigar: String,
    pub sequence: String,
    pub quality: String,
}

impl AlignedRead {
    pub fn new(
        qname: impl Into<String>,
        ref_start: usize,
        cigar: impl Into<String>,
        sequence: impl Into<String>,
        quality: impl Into<String>,
    ) -> Self {
        Self {
            qname: qname.into(),
            flags: 0,
            reference_name: String::new(),
            ref_start,
            cigar: cigar.into(),
            sequence: sequence.into(),
            quality: quality.into(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_reference_name(mut self, name: impl Into<String>) -> Self {
        self.reference_name = name.into();
        self
    }

    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.flags & FLAG_UNMAPPED != 0 || self.reference_name == UNMAPPED_REFERENCE
    }

    #[must_use]
    pub fn is_supplementary(&self) -> bool {
        self.flags & FLAG_SUPPLEMENTARY != 0
    }

    /// Records the engine must never see: unmapped, or a supplementary alignment.
    ///
    /// An unmapped mate placed next to its partner keeps RNAME and POS but
    /// has no alignment, so flag 0x4 alone is enough.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.is_unmapped() || self.is_supplementary()
    }
}

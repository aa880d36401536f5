use serde::Serialize;

/// Genome length of the SARS-CoV-2 reference (NC_045512.2)
pub const DEFAULT_GENOME_LENGTH: usize = 29_903;

/// The reference genome reads were aligned against
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceGenome {
    /// Sequence name from the FASTA header
    pub name: String,

    /// Uppercase reference bases
    #[serde(skip)]
    pub sequence: Vec<u8>,

    /// MD5 of the uppercase sequence, lowercase hex
    pub md5: String,
}

impl ReferenceGenome {
    /// Build a reference from raw bases, normalizing to uppercase
    pub fn new(name: impl Into<String>, sequence: &[u8]) -> Self {
        let sequence: Vec<u8> = sequence.iter().map(u8::to_ascii_uppercase).collect();
        let md5 = format!("{:x}", md5::compute(&sequence));

        Self {
            name: name.into(),
            sequence,
            md5,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Reference base at a 0-indexed position
    #[must_use]
    pub fn base(&self, pos: usize) -> Option<char> {
        self.sequence.get(pos).map(|&b| char::from(b))
    }
}

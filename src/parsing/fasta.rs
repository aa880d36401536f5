//! Reference genome loading using noodles.
//!
//! Supports both uncompressed and gzip/bgzip compressed FASTA files. Only
//! the first sequence is used; viral references carry a single contig.

use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use noodles::fasta;
use tracing::{debug, warn};

use crate::core::reference::ReferenceGenome;
use crate::parsing::sam::ParseError;
use crate::utils::validation::is_gzipped;

/// Load the reference genome from a FASTA file.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, or `ParseError::InvalidFormat` if the file holds no
/// sequence or the first sequence is empty.
pub fn load_reference(path: &Path) -> Result<ReferenceGenome, ParseError> {
    let file = std::fs::File::open(path)?;

    let reference = if is_gzipped(path) {
        let mut reader = fasta::io::Reader::new(BufReader::new(GzDecoder::new(file)));
        read_first_record(&mut reader)?
    } else {
        let mut reader = fasta::io::Reader::new(BufReader::new(file));
        read_first_record(&mut reader)?
    };

    debug!(
        name = %reference.name,
        length = reference.len(),
        md5 = %reference.md5,
        "Loaded reference"
    );
    Ok(reference)
}

/// Read the first record from a noodles FASTA reader
fn read_first_record<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
) -> Result<ReferenceGenome, ParseError> {
    let mut records = reader.records();

    let record = records
        .next()
        .ok_or_else(|| ParseError::InvalidFormat("No sequences found in FASTA file".to_string()))?
        .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

    let name = String::from_utf8_lossy(record.name()).to_string();
    let reference = ReferenceGenome::new(name, record.sequence().as_ref());

    if reference.is_empty() {
        return Err(ParseError::InvalidFormat(format!(
            "Reference sequence '{}' is empty",
            reference.name
        )));
    }

    let extra = records.count();
    if extra > 0 {
        warn!(
            reference = %reference.name,
            ignored = extra,
            "FASTA has more than one sequence, using the first"
        );
    }

    Ok(reference)
}

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use noodles::bam;
use noodles::sam;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::RecordBuf;
use thiserror::Error;
use tracing::debug;

use crate::core::read::{AlignedRead, UNMAPPED_REFERENCE};
use crate::engine::extract::PHRED_OFFSET;
use crate::utils::validation::is_gzipped;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid alignment record: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Container format of an alignment input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Sam,
    Bam,
}

impl AlignmentFormat {
    /// Guess the format from the file name.
    ///
    /// `-` (stdin), `.sam`, `.sam.gz` and extension-less paths are SAM text.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnsupportedFormat` for CRAM or any other extension.
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        if path == Path::new("-") {
            return Ok(Self::Sam);
        }

        let lower = path.to_string_lossy().to_lowercase();
        let stem = lower
            .strip_suffix(".gz")
            .or_else(|| lower.strip_suffix(".bgz"))
            .unwrap_or(&lower);

        match Path::new(stem).extension().and_then(|e| e.to_str()) {
            Some("sam") | None => Ok(Self::Sam),
            Some("bam") => Ok(Self::Bam),
            Some(ext) => Err(ParseError::UnsupportedFormat(ext.to_string())),
        }
    }
}

type RecordSource = Box<dyn Iterator<Item = Result<AlignedRead, ParseError>>>;

/// Streams aligned reads from SAM or BAM input.
///
/// Unmapped records (flag 0x4 or no reference) and supplementary
/// alignments are dropped here and counted; they never reach the engine.
/// Iteration stops after the first error.
pub struct AlignmentReader {
    source: RecordSource,
    filtered: u64,
    failed: bool,
}

impl AlignmentReader {
    /// Open a SAM (plain or gzip), BAM, or `-` for SAM on stdin
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be opened,
    /// `ParseError::Noodles` if the header cannot be read, or
    /// `ParseError::UnsupportedFormat` for unknown extensions.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        match AlignmentFormat::from_path(path)? {
            AlignmentFormat::Sam if path == Path::new("-") => {
                Self::from_sam(BufReader::new(io::stdin()))
            }
            AlignmentFormat::Sam if is_gzipped(path) => {
                let file = File::open(path)?;
                Self::from_sam(BufReader::new(GzDecoder::new(file)))
            }
            AlignmentFormat::Sam => Self::from_sam(BufReader::new(File::open(path)?)),
            AlignmentFormat::Bam => Ok(Self::new(Box::new(bam_records(path)?))),
        }
    }

    /// Read SAM text from any buffered reader
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Noodles` if the header cannot be read.
    pub fn from_sam<R: BufRead + 'static>(inner: R) -> Result<Self, ParseError> {
        let mut reader = sam::io::Reader::new(inner);
        let header = reader
            .read_header()
            .map_err(|e| ParseError::Noodles(e.to_string()))?;
        debug!(
            references = header.reference_sequences().len(),
            "Read SAM header"
        );

        Ok(Self::new(Box::new(record_stream(
            header,
            move |header, record| reader.read_record_buf(header, record),
        ))))
    }

    fn new(source: RecordSource) -> Self {
        Self {
            source,
            filtered: 0,
            failed: false,
        }
    }

    /// Records dropped for being unmapped or supplementary
    #[must_use]
    pub fn filtered(&self) -> u64 {
        self.filtered
    }
}

impl Iterator for AlignmentReader {
    type Item = Result<AlignedRead, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.source.next()? {
                Ok(read) if read.is_filtered() => {
                    self.filtered += 1;
                }
                Ok(read) => return Some(Ok(read)),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Stream records from a BAM file
fn bam_records(
    path: &Path,
) -> Result<impl Iterator<Item = Result<AlignedRead, ParseError>>, ParseError> {
    let mut reader = File::open(path).map(BufReader::new).map(bam::io::Reader::new)?;

    let header = reader
        .read_header()
        .map_err(|e| ParseError::Noodles(e.to_string()))?;
    debug!(
        references = header.reference_sequences().len(),
        "Read BAM header"
    );

    Ok(record_stream(header, move |header, record| {
        reader.read_record_buf(header, record)
    }))
}

/// Turn a `read_record_buf` loop into an iterator of reads.
///
/// `read_next` returns 0 at end of input. Malformed records are reported with
/// their 1-based record number.
fn record_stream<F>(
    header: sam::Header,
    mut read_next: F,
) -> impl Iterator<Item = Result<AlignedRead, ParseError>>
where
    F: FnMut(&sam::Header, &mut RecordBuf) -> io::Result<usize>,
{
    let mut record = RecordBuf::default();
    let mut record_number = 0u64;

    std::iter::from_fn(move || {
        record_number += 1;
        match read_next(&header, &mut record) {
            Ok(0) => None,
            Ok(_) => Some(
                record_to_read(&header, &record)
                    .map_err(|msg| ParseError::InvalidFormat(format!("record {record_number}: {msg}"))),
            ),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Some(Err(
                ParseError::InvalidFormat(format!("record {record_number}: {e}")),
            )),
            Err(e) => Some(Err(ParseError::Io(e))),
        }
    })
}

/// Convert a decoded SAM/BAM record into the engine's read type
///
/// Qualities, when present, must cover every base.
fn record_to_read(header: &sam::Header, record: &RecordBuf) -> Result<AlignedRead, String> {
    let bases = record.sequence().as_ref();
    let scores = record.quality_scores().as_ref();
    if !scores.is_empty() && scores.len() != bases.len() {
        return Err(format!(
            "{} base qualities for {} bases",
            scores.len(),
            bases.len()
        ));
    }

    let qname = record
        .name()
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_default();

    let reference_name = record
        .reference_sequence_id()
        .and_then(|id| header.reference_sequences().get_index(id))
        .map_or_else(|| UNMAPPED_REFERENCE.to_string(), |(name, _)| name.to_string());

    let ref_start = record
        .alignment_start()
        .map_or(0, |p| usize::from(p) - 1);

    let cigar: String = record
        .cigar()
        .as_ref()
        .iter()
        .map(|op| format!("{}{}", op.len(), cigar_code(op.kind())))
        .collect();

    let sequence = String::from_utf8_lossy(bases).into_owned();
    let quality: String = scores
        .iter()
        .map(|&q| char::from(q.saturating_add(PHRED_OFFSET)))
        .collect();

    Ok(AlignedRead::new(qname, ref_start, cigar, sequence, quality)
        .with_flags(record.flags().bits())
        .with_reference_name(reference_name))
}

/// SAM text code of a CIGAR operation kind
fn cigar_code(kind: Kind) -> char {
    match kind {
        Kind::Match => 'M',
        Kind::Insertion => 'I',
        Kind::Deletion => 'D',
        Kind::Skip => 'N',
        Kind::SoftClip => 'S',
        Kind::HardClip => 'H',
        Kind::Pad => 'P',
        Kind::SequenceMatch => '=',
        Kind::SequenceMismatch => 'X',
    }
}

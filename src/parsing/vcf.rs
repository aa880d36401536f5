//! Parser for problematic-site VCF files.
//!
//! Known problematic positions (recurrent sequencing artefacts, homoplasic
//! sites) are distributed as a VCF whose FILTER column holds a
//! recommendation such as `mask` or `caution`:
//!
//! `NC_045512.2	187	.	A	.	.	mask	EXC=ARTIC;SRC=...`
//!
//! Each record masks the reference positions spanned by its REF allele.
//! Only the first seven columns are read, so INFO content never matters.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::core::types::{Interval, SiteMask};
use crate::parsing::sam::ParseError;
use crate::utils::validation::is_gzipped;

/// Read a problematic-site VCF (plain or gzipped) into a mask.
///
/// When `filter` is given only records whose FILTER column matches it
/// (case-insensitively) are masked.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read or
/// `ParseError::InvalidFormat` for a malformed data line.
pub fn parse_mask_file(path: &Path, filter: Option<&str>) -> Result<SiteMask, ParseError> {
    let file = std::fs::File::open(path)?;
    let reader: Box<dyn Read> = if is_gzipped(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    parse_mask_reader(BufReader::new(reader), filter)
}

/// Parse problematic-site VCF text into a mask
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` for a malformed data line.
pub fn parse_mask_text(text: &str, filter: Option<&str>) -> Result<SiteMask, ParseError> {
    parse_mask_reader(text.as_bytes(), filter)
}

fn parse_mask_reader<R: BufRead>(reader: R, filter: Option<&str>) -> Result<SiteMask, ParseError> {
    let mut mask = SiteMask::new();
    let mut records = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (range, record_filter) = parse_site_line(&line)
            .map_err(|msg| ParseError::InvalidFormat(format!("line {}: {msg}", index + 1)))?;

        if filter.is_some_and(|f| !record_filter.eq_ignore_ascii_case(f)) {
            continue;
        }
        mask.insert_range(range);
        records += 1;
    }

    debug!(records, positions = mask.len(), "Loaded problematic sites");
    Ok(mask)
}

/// Parse one VCF data line into its 0-indexed REF span and FILTER value
fn parse_site_line(line: &str) -> Result<(Interval, &str), String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        return Err(format!(
            "expected at least 7 tab-separated fields, found {}",
            fields.len()
        ));
    }

    let pos: usize = fields[1]
        .parse()
        .map_err(|_| format!("invalid POS '{}'", fields[1]))?;
    if pos == 0 {
        return Err("POS must be 1 or greater".to_string());
    }

    let ref_len = fields[3].len().max(1);
    let start = pos - 1;

    Ok((Interval::new(start, start + ref_len), fields[6]))
}

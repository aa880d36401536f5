//! Conversion of one aligned read into differences from the reference.
//!
//! The walk keeps a query cursor and a reference cursor. Reads are expected
//! to be aligned with explicit `=`/`X` operators (minimap2 `--eqx`), so
//! mismatches are read straight off the CIGAR without a reference lookup.

use crate::core::read::AlignedRead;
use crate::core::reference::DEFAULT_GENOME_LENGTH;
use crate::core::types::{DiffEvent, Interval, MissingRange};
use crate::engine::error::CigarError;

/// Ambiguous base code that voids an entire mismatch run
pub const AMBIGUOUS_BASE: u8 = b'N';

/// Offset of Phred+33 encoded base qualities
pub const PHRED_OFFSET: u8 = 33;

/// Default accepted nucleotide alphabet
pub const DEFAULT_ALPHABET: &str = "ACGT";

/// Default minimum base quality for a substitution call
pub const DEFAULT_MIN_QUALITY: u8 = 10;

/// Parameters for diff extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Length of the reference genome
    pub genome_length: usize,
    /// Bases accepted as substitution calls
    pub alphabet: String,
    /// Minimum decoded base quality for a substitution call
    pub min_quality: u8,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            genome_length: DEFAULT_GENOME_LENGTH,
            alphabet: DEFAULT_ALPHABET.to_string(),
            min_quality: DEFAULT_MIN_QUALITY,
        }
    }
}

/// Differences and missing ranges of a single read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDiffs {
    pub qname: String,
    /// Diffs in CIGAR order
    pub diffs: Vec<DiffEvent>,
    /// Ordered missing ranges: leading boundary, internal low-confidence
    /// ranges, trailing boundary
    pub missing: Vec<MissingRange>,
    /// Final query cursor
    pub query_consumed: usize,
    /// Final reference cursor (exclusive end of the alignment)
    pub ref_end: usize,
}

/// Split a CIGAR string into `(length, operator)` pairs.
///
/// Only the run-length syntax is checked here; operator support is decided
/// while walking the read.
///
/// # Errors
///
/// Returns `CigarError::MalformedLength` if an operator has no length, a
/// length does not fit in `usize`, or the string ends with digits.
pub fn parse_cigar(cigar: &str) -> Result<Vec<(usize, char)>, CigarError> {
    let mut ops = Vec::new();
    let mut num_start = 0;

    for (i, c) in cigar.char_indices() {
        if c.is_ascii_digit() {
            continue;
        }
        let length: usize = cigar[num_start..i]
            .parse()
            .map_err(|_| CigarError::MalformedLength(cigar.to_string()))?;
        ops.push((length, c));
        num_start = i + c.len_utf8();
    }

    if num_start != cigar.len() {
        return Err(CigarError::MalformedLength(cigar.to_string()));
    }

    Ok(ops)
}

/// Walk one read's CIGAR and collect its diffs and missing ranges.
///
/// # Errors
///
/// Returns a `CigarError` if the CIGAR has an unsupported operator, a bad
/// length, consumes more query bases than the read has, or overflows the
/// reference cursor. The caller skips
/// the record; nothing is partially emitted.
pub fn extract_diffs(read: &AlignedRead, config: &ExtractConfig) -> Result<ReadDiffs, CigarError> {
    let ops = parse_cigar(&read.cigar)?;
    let qual = read.quality.as_bytes();
    let alphabet = config.alphabet.as_bytes();

    let mut diffs = Vec::new();
    let mut missing = Vec::new();

    let mut rpos = read.ref_start;
    let mut left = 0usize;

    if rpos > 0 {
        missing.push(Interval::new(0, rpos));
    }

    for (length, op) in ops {
        match op {
            '=' | 'M' => {
                query_bases(read, left, length)?;
                left += length;
                rpos = advance(read, rpos, length)?;
            }
            'X' => {
                let bases = query_bases(read, left, length)?;
                let end = advance(read, rpos, length)?;
                if bases.iter().any(|b| b.eq_ignore_ascii_case(&AMBIGUOUS_BASE)) {
                    missing.push(Interval::new(rpos, end));
                } else {
                    // Adjacent mismatches are independent substitutions
                    for (i, &nt) in bases.iter().enumerate() {
                        let accepted = alphabet.contains(&nt)
                            && passes_quality(qual, left + i, config.min_quality);
                        if accepted {
                            diffs.push(DiffEvent::Substitution {
                                pos: rpos + i,
                                nt: char::from(nt),
                            });
                        } else {
                            missing.push(Interval::new(rpos + i, rpos + i + 1));
                        }
                    }
                }
                left += length;
                rpos = end;
            }
            'S' => {
                query_bases(read, left, length)?;
                left += length;
            }
            'I' => {
                let bases = query_bases(read, left, length)?;
                diffs.push(DiffEvent::Insertion {
                    pos: rpos,
                    seq: String::from_utf8_lossy(bases).into_owned(),
                });
                left += length;
            }
            'D' => {
                diffs.push(DiffEvent::Deletion { pos: rpos, length });
                rpos = advance(read, rpos, length)?;
            }
            'H' => {}
            _ => {
                return Err(CigarError::UnknownOperator {
                    op,
                    cigar: read.cigar.clone(),
                });
            }
        }
    }

    if rpos < config.genome_length {
        missing.push(Interval::new(rpos, config.genome_length));
    }

    Ok(ReadDiffs {
        qname: read.qname.clone(),
        diffs,
        missing,
        query_consumed: left,
        ref_end: rpos,
    })
}

/// Reference cursor moved by `length`, or an overrun error
fn advance(read: &AlignedRead, rpos: usize, length: usize) -> Result<usize, CigarError> {
    rpos.checked_add(length)
        .ok_or_else(|| CigarError::ReferenceOverrun {
            cigar: read.cigar.clone(),
        })
}

/// Query bases `[start, start + length)`, or an overrun error
fn query_bases(read: &AlignedRead, start: usize, length: usize) -> Result<&[u8], CigarError> {
    let seq = read.sequence.as_bytes();
    start
        .checked_add(length)
        .and_then(|end| seq.get(start..end))
        .ok_or_else(|| CigarError::QueryOverrun {
            cigar: read.cigar.clone(),
            needed: start.saturating_add(length),
            available: seq.len(),
        })
}

/// Quality test for one base; reads without qualities always pass
fn passes_quality(qual: &[u8], index: usize, min_quality: u8) -> bool {
    if qual.is_empty() {
        return true;
    }
    qual.get(index)
        .is_some_and(|&q| q.saturating_sub(PHRED_OFFSET) >= min_quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(genome_length: usize) -> ExtractConfig {
        ExtractConfig {
            genome_length,
            ..ExtractConfig::default()
        }
    }

    #[test]
    fn test_full_length_match_has_no_diffs() {
        let seq = "A".repeat(29_903);
        let qual = "I".repeat(29_903);
        let read = AlignedRead::new("r1", 0, "29903=", seq, qual);

        let result = extract_diffs(&read, &ExtractConfig::default()).unwrap();
        assert!(result.diffs.is_empty());
        assert!(result.missing.is_empty());
        assert_eq!(result.query_consumed, 29_903);
        assert_eq!(result.ref_end, 29_903);
    }

    #[test]
    fn test_boundary_missing_ranges() {
        let read = AlignedRead::new("r1", 40, "10=", "ACGTACGTAC", "IIIIIIIIII");
        let result = extract_diffs(&read, &config(100)).unwrap();

        assert_eq!(
            result.missing,
            vec![Interval::new(0, 40), Interval::new(50, 100)]
        );
    }

    #[test]
    fn test_clips_and_indels() {
        // S2 =3 I2 =3 D2 =4 starting at reference position 10
        let read = AlignedRead::new(
            "r1",
            10,
            "5H2S3=2I3=2D4=",
            "GGACGTTTACGACG",
            "IIIIIIIIIIIIII",
        );
        let result = extract_diffs(&read, &config(100)).unwrap();

        assert_eq!(
            result.diffs,
            vec![
                DiffEvent::Insertion {
                    pos: 13,
                    seq: "TT".to_string()
                },
                DiffEvent::Deletion {
                    pos: 16,
                    length: 2
                },
            ]
        );
        assert_eq!(
            result.missing,
            vec![Interval::new(0, 10), Interval::new(22, 100)]
        );
        assert_eq!(result.query_consumed, 14);
    }

    #[test]
    fn test_low_quality_base_only_marks_itself_missing() {
        // Mismatch run at 5..8, base 6 has quality 2
        let read = AlignedRead::new("r1", 0, "5=3X2=", "ACGTAGTCAA", "IIIIII#III");
        let result = extract_diffs(&read, &config(20)).unwrap();

        assert_eq!(
            result.diffs,
            vec![
                DiffEvent::Substitution { pos: 5, nt: 'G' },
                DiffEvent::Substitution { pos: 7, nt: 'C' },
            ]
        );
        assert_eq!(
            result.missing,
            vec![Interval::new(6, 7), Interval::new(10, 20)]
        );
    }

    #[test]
    fn test_quality_threshold_is_inclusive() {
        // '+' decodes to 10, ')' decodes to 8
        let read = AlignedRead::new("r1", 0, "2X", "TA", "+)");
        let result = extract_diffs(&read, &config(2)).unwrap();

        assert_eq!(
            result.diffs,
            vec![DiffEvent::Substitution { pos: 0, nt: 'T' }]
        );
        assert_eq!(result.missing, vec![Interval::new(1, 2)]);
    }

    #[test]
    fn test_ambiguous_run_is_missing_as_a_whole() {
        let read = AlignedRead::new("r1", 0, "2=3X", "ACNGT", "IIIII");
        let result = extract_diffs(&read, &config(5)).unwrap();

        assert!(result.diffs.is_empty());
        assert_eq!(result.missing, vec![Interval::new(2, 5)]);
    }

    #[test]
    fn test_base_outside_alphabet_is_missing() {
        let read = AlignedRead::new("r1", 0, "1X", "R", "I");
        let result = extract_diffs(&read, &config(1)).unwrap();

        assert!(result.diffs.is_empty());
        assert_eq!(result.missing, vec![Interval::new(0, 1)]);
    }

    #[test]
    fn test_missing_qualities_disable_quality_filter() {
        let read = AlignedRead::new("r1", 0, "1X", "T", "");
        let result = extract_diffs(&read, &config(1)).unwrap();

        assert_eq!(
            result.diffs,
            vec![DiffEvent::Substitution { pos: 0, nt: 'T' }]
        );
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let read = AlignedRead::new("r1", 0, "3=2N3=", "ACGTAC", "IIIIII");
        let err = extract_diffs(&read, &config(100)).unwrap_err();

        assert_eq!(
            err,
            CigarError::UnknownOperator {
                op: 'N',
                cigar: "3=2N3=".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_lengths() {
        assert!(matches!(
            parse_cigar("=5"),
            Err(CigarError::MalformedLength(_))
        ));
        assert!(matches!(
            parse_cigar("5=10"),
            Err(CigarError::MalformedLength(_))
        ));
        assert!(parse_cigar("").unwrap().is_empty());
        assert_eq!(
            parse_cigar("12=1X").unwrap(),
            vec![(12, '='), (1, 'X')]
        );
    }

    #[test]
    fn test_query_overrun() {
        let read = AlignedRead::new("r1", 0, "10=", "ACGT", "IIII");
        let err = extract_diffs(&read, &config(100)).unwrap_err();

        assert_eq!(
            err,
            CigarError::QueryOverrun {
                cigar: "10=".to_string(),
                needed: 10,
                available: 4
            }
        );
    }

    #[test]
    fn test_reference_overrun() {
        let huge = format!("1={}D", usize::MAX);
        let read = AlignedRead::new("r1", 5, huge.clone(), "A", "I");
        let err = extract_diffs(&read, &config(100)).unwrap_err();

        assert_eq!(err, CigarError::ReferenceOverrun { cigar: huge });
    }

    #[test]
    fn test_query_cursor_matches_sequence_length() {
        let cases = [
            ("4M", "ACGT"),
            ("2S2=", "ACGT"),
            ("1=1X1I1=", "ACGT"),
            ("3H2=3D2=4H", "ACGT"),
            ("1S1I1X1M", "ACGT"),
        ];

        for (cigar, seq) in cases {
            let read = AlignedRead::new("r1", 3, cigar, seq, "IIII");
            let result = extract_diffs(&read, &config(100)).unwrap();
            assert_eq!(result.query_consumed, seq.len(), "CIGAR {cigar}");
        }
    }
}

//! Centralized validation and helper functions.

use std::path::{Path, PathBuf};

/// Largest genome the depth table is allowed to cover (DOS protection)
pub const MAX_GENOME_LENGTH: usize = 100_000_000;

/// Validation error types for run settings and output paths
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Alphabet is empty")]
    EmptyAlphabet,
    #[error("Alphabet contains invalid character '{0}': only ASCII letters are allowed")]
    InvalidAlphabetCharacter(char),
    #[error("Alphabet must not contain the ambiguous base 'N'")]
    AmbiguousInAlphabet,
    #[error("Genome length must be between 1 and {MAX_GENOME_LENGTH}, got {0}")]
    InvalidGenomeLength(usize),
    #[error("Output file {} already exists (use --force to overwrite)", .0.display())]
    OutputExists(PathBuf),
}

/// Validate and normalize the accepted nucleotide alphabet.
///
/// Letters are uppercased and duplicates removed, keeping first-seen order.
///
/// # Examples
///
/// ```
/// use ww_mutfreq::utils::validation::normalize_alphabet;
///
/// assert_eq!(normalize_alphabet("acgtA").unwrap(), "ACGT");
/// assert!(normalize_alphabet("ACGN").is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::EmptyAlphabet` for an empty string,
/// `ValidationError::InvalidAlphabetCharacter` for anything but ASCII
/// letters, or `ValidationError::AmbiguousInAlphabet` if `N` is included.
pub fn normalize_alphabet(alphabet: &str) -> Result<String, ValidationError> {
    let mut normalized = String::new();

    for c in alphabet.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(ValidationError::InvalidAlphabetCharacter(c));
        }
        let upper = c.to_ascii_uppercase();
        if upper == 'N' {
            return Err(ValidationError::AmbiguousInAlphabet);
        }
        if !normalized.contains(upper) {
            normalized.push(upper);
        }
    }

    if normalized.is_empty() {
        return Err(ValidationError::EmptyAlphabet);
    }

    Ok(normalized)
}

/// Check that a genome length is usable for a depth table.
///
/// # Errors
///
/// Returns `ValidationError::InvalidGenomeLength` for zero or oversized lengths.
pub fn validate_genome_length(length: usize) -> Result<usize, ValidationError> {
    if length == 0 || length > MAX_GENOME_LENGTH {
        return Err(ValidationError::InvalidGenomeLength(length));
    }
    Ok(length)
}

/// Refuse to clobber an existing output file unless `force` is set.
///
/// # Errors
///
/// Returns `ValidationError::OutputExists` when the path exists and `force`
/// is false.
pub fn check_output_path(path: &Path, force: bool) -> Result<(), ValidationError> {
    if !force && path.exists() {
        return Err(ValidationError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

/// Check if the path is a gzipped file
#[must_use]
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

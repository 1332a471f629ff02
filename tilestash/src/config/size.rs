//! Human-readable size parsing (e.g., "2GB", "500MB").

use thiserror::Error;

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}': expected a byte count like '2GB', '500MB' or '1024'")]
pub struct SizeParseError {
    input: String,
}

/// Parse a human-readable size string into bytes.
///
/// Bare numbers are bytes. `K`/`KB`, `M`/`MB`, `G`/`GB` and `T`/`TB` are
/// binary multiples, case-insensitive, with optional whitespace before the
/// suffix.
///
/// ```
/// use tilestash::config::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("500 mb").unwrap(), 500 * 1024 * 1024);
/// ```
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let error = || SizeParseError {
        input: input.to_string(),
    };

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);

    let multiplier: u64 = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        "T" | "TB" => 1024 * 1024 * 1024 * 1024,
        _ => return Err(error()),
    };

    let value: u64 = digits.parse().map_err(|_| error())?;
    value.checked_mul(multiplier).ok_or_else(error)
}

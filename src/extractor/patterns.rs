// file: src/extractor/patterns.rs
// description: compiled regex patterns for page layout detection
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A header/footer line that holds nothing but a page number, e.g. "12", "- 12 -", "Page 12", "iv"
    pub static ref PRINTED_PAGE_LINE: Regex = Regex::new(
        r"(?i)^\s*(?:page\s+)?[-–]?\s*(\d{1,4}|[ivxlcdm]{1,7})\s*[-–]?\s*$"
    ).expect("PRINTED_PAGE_LINE regex is valid");

    pub static ref CORPORATE_IDENTITY_NUMBER: Regex = Regex::new(
        r"\b[LU]\d{5}[A-Z]{2}\d{4}[A-Z]{3}\d{6}\b"
    ).expect("CORPORATE_IDENTITY_NUMBER regex is valid");
}

/// Returns the printed page token from the last (then first) non-empty line, or an empty string.
pub fn detect_printed_page_number(page_text: &str) -> String {
    let mut lines = page_text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.next();
    let last = lines.last().or(first);

    for candidate in [last, first].into_iter().flatten() {
        if let Some(captures) = PRINTED_PAGE_LINE.captures(candidate)
            && let Some(token) = captures.get(1)
        {
            return token.as_str().to_string();
        }
    }

    String::new()
}

/// Checks that an identifier has the shape of an Indian Corporate Identity Number.
pub fn looks_like_cin(identifier: &str) -> bool {
    let trimmed = identifier.trim();
    trimmed.len() == 21 && CORPORATE_IDENTITY_NUMBER.is_match(trimmed)
}

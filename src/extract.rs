//! Code extraction and document text readers.
//!
//! [`extract_codes`] is the lexical mining step: a single regex scan over
//! page or document text, followed by validity filters (digit required,
//! length ≥ 5 after trimming trailing periods). It is a pure function; the
//! same input always yields the same set.
//!
//! The reader half turns catalog files into text: whole-document for small
//! files, page-by-page for large PDFs. Readers return [`DocumentError`] so
//! the mining orchestrator can skip a broken document and keep scanning.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Token class for part-number candidates: runs of 5–17 uppercase
/// alphanumerics, hyphens, and periods, bounded by non-token characters.
/// Deliberately permissive; the digit filter below rejects plain words.
const SKU_PATTERN: &str = r"\b[A-Z0-9\-\.]{5,17}\b";

fn sku_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SKU_PATTERN).expect("SKU pattern is valid"))
}

/// Extract the deduplicated set of candidate codes from a block of text.
///
/// A match is kept only if it contains at least one ASCII digit and is still
/// at least 5 characters long after trimming trailing periods. The trimmed
/// form is what gets stored.
pub fn extract_codes(text: &str) -> HashSet<String> {
    let mut codes = HashSet::new();
    for m in sku_regex().find_iter(text) {
        let raw = m.as_str();
        if !raw.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }
        let clean = raw.trim_end_matches('.');
        if clean.len() >= 5 {
            codes.insert(clean.to_string());
        }
    }
    codes
}

/// Document reader error. Non-fatal at corpus level: the orchestrator logs
/// and moves on to the next document.
#[derive(Debug)]
pub enum DocumentError {
    UnsupportedExtension(String),
    Read(String),
    Pdf(String),
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::UnsupportedExtension(ext) => {
                write!(f, "unsupported document extension: {}", ext)
            }
            DocumentError::Read(e) => write!(f, "document read failed: {}", e),
            DocumentError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for DocumentError {}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// True if the file extension is one the miner can read.
pub fn is_supported(path: &Path) -> bool {
    matches!(extension_of(path).as_str(), "pdf" | "txt")
}

/// Read a document's entire text content in one pass.
pub fn read_document(path: &Path) -> Result<String, DocumentError> {
    match extension_of(path).as_str() {
        "pdf" => pdf_extract::extract_text(path).map_err(|e| DocumentError::Pdf(e.to_string())),
        "txt" => std::fs::read_to_string(path).map_err(|e| DocumentError::Read(e.to_string())),
        ext => Err(DocumentError::UnsupportedExtension(ext.to_string())),
    }
}

/// Read a document as a sequence of page texts, for streaming mining.
/// Plain-text files have no page structure and come back as one page.
pub fn document_pages(path: &Path) -> Result<Vec<String>, DocumentError> {
    match extension_of(path).as_str() {
        "pdf" => {
            pdf_extract::extract_text_by_pages(path).map_err(|e| DocumentError::Pdf(e.to_string()))
        }
        "txt" => Ok(vec![std::fs::read_to_string(path)
            .map_err(|e| DocumentError::Read(e.to_string()))?]),
        ext => Err(DocumentError::UnsupportedExtension(ext.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_digit_bearing_tokens_only() {
        let codes = extract_codes("Filter HF6553-OLD and part 8923712 plus word");
        let expected: HashSet<String> = ["HF6553-OLD", "8923712"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn empty_text_yields_empty_set() {
        assert!(extract_codes("").is_empty());
    }

    #[test]
    fn text_without_digits_yields_empty_set() {
        assert!(extract_codes("HEAVY DUTY FILTERS CATALOG EDITION").is_empty());
    }

    #[test]
    fn trailing_periods_are_trimmed_before_storage() {
        let codes = extract_codes("see P550440. and W950-3.");
        assert!(codes.contains("P550440"));
        assert!(codes.contains("W950-3"));
        assert!(!codes.iter().any(|c| c.ends_with('.')));

        // A boundary match can end in '.' when the 17-char cap cuts a longer
        // run; the stored form is still trimmed.
        let capped = extract_codes("AAAA1111AAAA1111.X");
        assert!(capped.contains("AAAA1111AAAA1111"));
        assert!(!capped.iter().any(|c| c.ends_with('.')));
    }

    #[test]
    fn short_after_trim_is_dropped_not_truncated() {
        // "W95.." matches the pattern but trims to 3 characters.
        let codes = extract_codes("bad W95.. token");
        assert!(codes.is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "P550440 LF3349 8923712 B7030 FS19532 some words 12-34 A.1";
        assert_eq!(extract_codes(text), extract_codes(text));
    }

    #[test]
    fn length_bounds_are_enforced() {
        // 4 chars: too short. 18 chars: not matched as a single token.
        let codes = extract_codes("AB12 A123456789012345678");
        assert!(!codes.contains("AB12"));
        assert!(!codes.iter().any(|c| c.len() > 17));
    }

    #[test]
    fn filter_invariants_hold_for_all_outputs() {
        let text = "P550440. X9 LF3349 CAT-1R0716 manual.pdf 99.5 OIL-FILTER";
        for code in extract_codes(text) {
            assert!(code.chars().any(|c| c.is_ascii_digit()), "{}", code);
            assert!(code.trim_end_matches('.').len() >= 5, "{}", code);
        }
    }

    #[test]
    fn unsupported_extension_is_detected() {
        assert!(!is_supported(Path::new("notes.docx")));
        assert!(is_supported(Path::new("catalog.PDF")));
        assert!(is_supported(Path::new("dump.txt")));
    }

    #[test]
    fn reading_unsupported_document_fails() {
        let err = read_document(Path::new("catalog.xlsx")).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedExtension(_)));
    }

    #[test]
    fn reading_missing_txt_fails_with_read_error() {
        let err = read_document(Path::new("/nonexistent/dump.txt")).unwrap_err();
        assert!(matches!(err, DocumentError::Read(_)));
    }
}

//! Document text extraction.
//!
//! Maps raw files to plain text. Only plain-text formats are handled here;
//! richer formats (PDF, Word) are expected to be converted to text by an
//! external tool before ingestion.

use crate::error::{LeseError, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Extensions read directly as UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// A source document with its extracted text.
///
/// Immutable once created; re-ingesting the same file produces a new
/// `SourceDocument` with the same id.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Stable document identifier derived from the file name.
    pub id: String,
    /// Origin file name as uploaded.
    pub file_name: String,
    /// Extracted plain text.
    pub text: String,
    /// When extraction happened.
    pub extracted_at: DateTime<Utc>,
}

/// Derive a stable document id from a file name.
///
/// Lowercased, with path separators and whitespace replaced so the id is safe
/// to embed in chunk ids. Identical file names always map to the same id.
pub fn document_id(file_name: &str) -> String {
    file_name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Check whether a file extension is supported for ingestion.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extract a document from a file on disk.
pub fn extract_file(path: &Path) -> Result<SourceDocument> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LeseError::InvalidInput(format!("Invalid path: {}", path.display())))?
        .to_string();

    if !is_supported(path) {
        return Err(LeseError::Extraction(format!(
            "Unsupported file type: {} (supported: .txt, .md; convert PDF/Word to text first)",
            file_name
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| LeseError::Extraction(format!("Failed to read {}: {}", file_name, e)))?;

    extract_text(&file_name, &bytes)
}

/// Extract a document from raw bytes.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<SourceDocument> {
    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
        LeseError::Extraction(format!("{} is not valid UTF-8 text", file_name))
    })?;

    // Normalize line endings so chunk offsets are consistent across platforms.
    let text = text.replace("\r\n", "\n");

    Ok(SourceDocument {
        id: document_id(file_name),
        file_name: file_name.to_string(),
        text,
        extracted_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_stable_and_sanitized() {
        assert_eq!(document_id("Handbook.txt"), "handbook.txt");
        assert_eq!(document_id("my notes (v2).md"), "my_notes__v2_.md");
        assert_eq!(document_id("Handbook.txt"), document_id("handbook.TXT"));
    }

    #[test]
    fn test_extract_text_normalizes_line_endings() {
        let doc = extract_text("notes.txt", b"line one\r\nline two\r\n").unwrap();
        assert_eq!(doc.text, "line one\nline two\n");
        assert_eq!(doc.id, "notes.txt");
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = extract_file(Path::new("report.pdf")).unwrap_err();
        assert!(matches!(err, LeseError::Extraction(_)));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = extract_text("junk.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, LeseError::Extraction(_)));
    }
}

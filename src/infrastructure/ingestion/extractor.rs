//! Built-in text extraction for uploaded files

use crate::domain::ingestion::TextExtractor;
use crate::domain::DomainError;

/// Extracts UTF-8 text formats directly.
///
/// Binary office formats are recognised but not parsed; they are rejected
/// with a message telling the caller to convert them first.
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn decode(bytes: &[u8]) -> Result<String, DomainError> {
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| DomainError::extraction(format!("File is not valid UTF-8 text: {}", e)))?;
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }
}

impl TextExtractor for PlainTextExtractor {
    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown", "json", "pdf", "docx"]
    }

    fn extract(&self, extension: &str, bytes: &[u8]) -> Result<String, DomainError> {
        let text = match extension.to_lowercase().as_str() {
            "txt" | "md" | "markdown" => Self::decode(bytes)?,
            "json" => {
                let raw = Self::decode(bytes)?;
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|e| DomainError::extraction(format!("Invalid JSON file: {}", e)))?;
                serde_json::to_string_pretty(&value)
                    .map_err(|e| DomainError::extraction(format!("Invalid JSON file: {}", e)))?
            }
            "pdf" => {
                return Err(DomainError::extraction(
                    "No extractable text in PDF. For scanned PDFs, run OCR first and upload the text",
                ))
            }
            "docx" => {
                return Err(DomainError::extraction(
                    "No extractable text in DOCX. Convert the document to .txt or .md and upload it again",
                ))
            }
            other => {
                return Err(DomainError::validation(format!(
                    "Unsupported file type: .{}",
                    other
                )))
            }
        };

        if text.trim().is_empty() {
            return Err(DomainError::extraction("No extractable text in file"));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_markdown() {
        let extractor = PlainTextExtractor::new();
        assert_eq!(extractor.extract("txt", b"hello").unwrap(), "hello");
        assert_eq!(extractor.extract("MD", "\u{feff}# Title".as_bytes()).unwrap(), "# Title");
    }

    #[test]
    fn test_json_is_pretty_printed() {
        let text = PlainTextExtractor::new()
            .extract("json", br#"{"a":1}"#)
            .unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_empty_and_binary_formats_fail() {
        let extractor = PlainTextExtractor::new();
        assert!(matches!(
            extractor.extract("txt", b"   \n"),
            Err(DomainError::Extraction { .. })
        ));
        let err = extractor.extract("pdf", b"%PDF-1.4").unwrap_err();
        assert!(err.to_string().contains("OCR"));
        assert!(extractor.extract("exe", b"MZ").is_err());
    }

    #[test]
    fn test_supports_is_case_insensitive() {
        let extractor = PlainTextExtractor::new();
        assert!(extractor.supports("PDF"));
        assert!(!extractor.supports("exe"));
    }
}

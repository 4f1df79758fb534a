//! Canonical search result shape shared by every provider

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::document::Metadata;

/// Placeholder used when a result carries no usable file name
pub const UNKNOWN_FILE_NAME: &str = "Unknown";

/// A single vector search hit, normalized across providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub chunk_id: String,
    pub document_id: String,
    pub file_name: String,
    pub content: String,
    pub line_start: u64,
    pub line_end: u64,
    #[serde(default)]
    pub metadata: Metadata,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl VectorSearchResult {
    /// Build a result from a provider record (a Mongo document, a Qdrant
    /// payload, Pinecone metadata or a Redis hash).
    ///
    /// Providers disagree on field names and types, so this is the single
    /// place that decides the canonical shape:
    /// - `content` falls back to `chunk_text`, then `text`
    /// - `document_id` falls back to `origin_id`
    /// - `file_name` falls back to `metadata.file_name`, `metadata.filename`,
    ///   then `"Unknown"`
    /// - line numbers are coerced to non-negative integers, defaulting to 0,
    ///   and may also be read from `metadata`
    pub fn from_record(record: &Metadata, score: f64) -> Self {
        let metadata = match record.get("metadata") {
            Some(Value::Object(map)) => map.clone(),
            _ => Metadata::new(),
        };

        let text_field = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| record.get(*key))
                .find_map(non_blank_string)
                .unwrap_or_default()
        };

        let line = |key: &str| {
            record
                .get(key)
                .or_else(|| metadata.get(key))
                .map(coerce_line)
                .unwrap_or(0)
        };

        let mut result = Self {
            chunk_id: text_field(&["chunk_id", "id"]),
            document_id: text_field(&["document_id", "origin_id"]),
            file_name: record
                .get("file_name")
                .and_then(non_blank_string)
                .unwrap_or_default(),
            content: text_field(&["content", "chunk_text", "text"]),
            line_start: line("line_start"),
            line_end: line("line_end"),
            metadata,
            score,
            connection_id: None,
            provider: None,
        };
        result.normalize_file_name();
        result
    }

    /// Attribute the result to the connection that produced it
    pub fn tagged(mut self, connection_id: impl Into<String>, provider: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self.provider = Some(provider.into());
        self
    }

    /// A result without text cannot serve as an answer source
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Re-apply the canonical defaults; idempotent.
    pub fn normalize(mut self) -> Self {
        self.normalize_file_name();
        if !self.score.is_finite() {
            self.score = 0.0;
        }
        self
    }

    fn normalize_file_name(&mut self) {
        if !self.file_name.trim().is_empty() {
            return;
        }

        self.file_name = ["file_name", "filename"]
            .iter()
            .filter_map(|key| self.metadata.get(*key))
            .find_map(non_blank_string)
            .unwrap_or_else(|| UNKNOWN_FILE_NAME.to_string());
    }
}

fn non_blank_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a JSON value to a non-negative line number; anything unreadable is 0.
pub fn coerce_line(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .ok()
            .or_else(|| {
                s.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|f| *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        _ => 0,
    }
}

/// Coerce a JSON value to a score; anything unreadable is 0.0.
pub fn coerce_score(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_record_full() {
        let result = VectorSearchResult::from_record(
            &record(json!({
                "chunk_id": "doc_chunk_0",
                "document_id": "doc",
                "file_name": "notes.md",
                "content": "hello",
                "line_start": 3,
                "line_end": 7,
                "metadata": {"origin_source_type": "filesystem"}
            })),
            0.87,
        );

        assert_eq!(result.chunk_id, "doc_chunk_0");
        assert_eq!(result.file_name, "notes.md");
        assert_eq!(result.line_start, 3);
        assert_eq!(result.line_end, 7);
        assert_eq!(result.score, 0.87);
        assert_eq!(result.metadata["origin_source_type"], "filesystem");
    }

    #[test]
    fn test_from_record_defaults() {
        let result = VectorSearchResult::from_record(
            &record(json!({"content": "text", "file_name": "  ", "line_start": "12"})),
            0.5,
        );

        assert_eq!(result.file_name, UNKNOWN_FILE_NAME);
        assert_eq!(result.line_start, 12);
        assert_eq!(result.line_end, 0);
        assert_eq!(result.document_id, "");
    }

    #[test]
    fn test_file_name_falls_back_to_metadata() {
        let result = VectorSearchResult::from_record(
            &record(json!({"content": "x", "metadata": {"filename": "report.txt"}})),
            0.1,
        );
        assert_eq!(result.file_name, "report.txt");
    }

    #[test]
    fn test_semantic_record_shape() {
        let result = VectorSearchResult::from_record(
            &record(json!({
                "origin_id": "507f",
                "chunk_id": "chunk_0",
                "chunk_text": "title: Sample",
                "metadata": {"line_start": 1, "line_end": 2}
            })),
            0.9,
        );

        assert_eq!(result.document_id, "507f");
        assert_eq!(result.content, "title: Sample");
        assert_eq!(result.line_end, 2);
    }

    #[test]
    fn test_coercions() {
        assert_eq!(coerce_line(&json!(4.0)), 4);
        assert_eq!(coerce_line(&json!(-2)), 0);
        assert_eq!(coerce_line(&json!(null)), 0);
        assert_eq!(coerce_score(&json!("0.25")), 0.25);
        assert_eq!(coerce_score(&json!({"a": 1})), 0.0);
    }

    #[test]
    fn test_normalize_non_finite_score() {
        let result = VectorSearchResult::from_record(&record(json!({"content": "x"})), f64::NAN)
            .normalize();
        assert_eq!(result.score, 0.0);
    }
}

use serde::{Deserialize, Serialize};

use super::Metadata;

/// A chunk produced from a raw document and destined for a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// `{raw_document_id}_chunk_{index}` on the raw path
    pub chunk_id: String,
    pub document_id: String,
    pub file_name: String,
    pub chunk_index: usize,
    pub content: String,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_document_id: Option<String>,
}

impl DocumentChunk {
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// A chunk written straight from an origin document into a semantic collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticChunk {
    pub origin_id: String,
    /// `chunk_{index}`, unique within one origin document
    pub chunk_id: String,
    pub chunk_text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SemanticChunk {
    /// Storage key; `(origin_id, chunk_id)` is unique inside a semantic collection.
    pub fn key(&self) -> String {
        format!("{}:{}", self.origin_id, self.chunk_id)
    }
}

//! Query request and answer types

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::RetrievalDiagnosis;

pub const DEFAULT_TOP_K: usize = 5;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// A natural-language question routed across one or more connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, message = "query must not be empty"))]
    pub query: String,
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 100))]
    pub top_k: usize,
    /// Registered connections to search; empty means the default vector store
    #[serde(default)]
    pub connection_ids: Vec<String>,
    /// Collection specs: `conn:coll`, `db.coll` or a bare name
    #[serde(default)]
    pub collections: Vec<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            connection_ids: Vec::new(),
            collections: Vec::new(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_connections(mut self, connection_ids: Vec<String>) -> Self {
        self.connection_ids = connection_ids;
        self
    }

    pub fn with_collections(mut self, collections: Vec<String>) -> Self {
        self.collections = collections;
        self
    }
}

/// A retrieved chunk cited in an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    pub file_name: String,
    pub line_start: u64,
    pub line_end: u64,
    /// First 200 characters of the chunk followed by `...`
    pub content: String,
    /// Similarity score rounded to 4 decimal places
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceReference>,
    pub query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<RetrievalDiagnosis>,
}

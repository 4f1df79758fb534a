use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Metadata;

/// A normalized document fetched from an origin source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginDocument {
    /// Identifier of the document inside its origin
    pub origin_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Collection the document was read from, when the origin has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_db: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OriginDocument {
    pub fn new(origin_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            origin_id: origin_id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            origin_collection: None,
            origin_db: None,
            updated_at: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_collection(
        mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        self.origin_db = Some(database.into());
        self.origin_collection = Some(collection.into());
        self
    }

    pub fn with_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = updated_at;
        self
    }
}

/// Lightweight listing entry returned by `OriginSource::list_documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginDocumentPreview {
    pub origin_id: String,
    pub title: String,
    pub preview: String,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

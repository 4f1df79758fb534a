use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Metadata;
use crate::domain::origin::OriginSourceType;
use crate::domain::DomainError;

/// Lifecycle of a raw document.
///
/// `Pending -> Processing -> Processed | Failed`; a failed document may be
/// reprocessed, which moves it back to `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawDocumentStatus {
    #[default]
    Pending,
    Processing,
    Processed,
    Failed,
}

impl RawDocumentStatus {
    pub const ALL: [RawDocumentStatus; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Processed,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RawDocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RawDocumentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::validation(format!(
                "Unknown raw document status '{}'. Expected one of: pending, processing, processed, failed",
                other
            ))),
        }
    }
}

/// Unmodified content fetched from an origin, persisted before any chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub raw_document_id: String,
    pub origin_source_type: OriginSourceType,
    #[serde(default)]
    pub origin_source_id: Option<String>,
    pub origin_id: String,
    pub raw_content: String,
    pub content_type: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub status: RawDocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RawDocument {
    /// Create a pending raw document with a fresh identifier.
    pub fn new(
        origin_source_type: OriginSourceType,
        origin_id: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            raw_document_id: uuid::Uuid::new_v4().to_string(),
            origin_source_type,
            origin_source_id: None,
            origin_id: origin_id.into(),
            raw_content: raw_content.into(),
            content_type: "text".to_string(),
            metadata: Metadata::new(),
            status: RawDocumentStatus::Pending,
            created_at: now,
            updated_at: now,
            processed_at: None,
            error_message: None,
        }
    }

    pub fn with_source_id(mut self, source_id: Option<String>) -> Self {
        self.origin_source_id = source_id;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Apply a status transition. Only failures carry an error message.
    pub fn set_status(&mut self, status: RawDocumentStatus, error_message: Option<String>) {
        let now = Utc::now();

        self.status = status;
        self.error_message = match status {
            RawDocumentStatus::Failed => error_message,
            _ => None,
        };
        if status == RawDocumentStatus::Processed {
            self.processed_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Human-readable name used for chunk attribution.
    pub fn display_name(&self) -> String {
        ["file_name", "title"]
            .iter()
            .filter_map(|key| self.metadata.get(*key))
            .filter_map(|value| value.as_str())
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("origin_{}", self.origin_id))
    }
}

/// Optional filters for listing raw documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDocumentFilter {
    pub status: Option<RawDocumentStatus>,
    pub origin_source_type: Option<OriginSourceType>,
    pub origin_source_id: Option<String>,
}

impl RawDocumentFilter {
    pub fn with_status(mut self, status: RawDocumentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source_type(mut self, source_type: OriginSourceType) -> Self {
        self.origin_source_type = Some(source_type);
        self
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.origin_source_id = Some(source_id.into());
        self
    }

    pub fn matches(&self, document: &RawDocument) -> bool {
        self.status.is_none_or(|s| s == document.status)
            && self
                .origin_source_type
                .is_none_or(|t| t == document.origin_source_type)
            && self
                .origin_source_id
                .as_ref()
                .is_none_or(|id| document.origin_source_id.as_ref() == Some(id))
    }
}

/// Number of raw documents per status; statuses with no documents report zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub processing: u64,
    pub processed: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: RawDocumentStatus, count: u64) {
        match status {
            RawDocumentStatus::Pending => self.pending += count,
            RawDocumentStatus::Processing => self.processing += count,
            RawDocumentStatus::Processed => self.processed += count,
            RawDocumentStatus::Failed => self.failed += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.processed + self.failed
    }
}

/// Result of persisting a raw document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub raw_document_id: String,
    /// A document for the same origin already existed
    pub was_duplicate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_raw_document_is_pending() {
        let doc = RawDocument::new(OriginSourceType::Mongodb, "abc", "hello");

        assert_eq!(doc.status, RawDocumentStatus::Pending);
        assert_eq!(doc.content_type, "text");
        assert!(uuid::Uuid::parse_str(&doc.raw_document_id).is_ok());
    }

    #[test]
    fn test_set_status_clears_error_unless_failed() {
        let mut doc = RawDocument::new(OriginSourceType::Filesystem, "a.txt", "x");

        doc.set_status(RawDocumentStatus::Failed, Some("boom".to_string()));
        assert_eq!(doc.error_message.as_deref(), Some("boom"));

        doc.set_status(RawDocumentStatus::Processing, Some("ignored".to_string()));
        assert!(doc.error_message.is_none());
        assert!(doc.processed_at.is_none());

        doc.set_status(RawDocumentStatus::Processed, None);
        assert!(doc.processed_at.is_some());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), json!("The Matrix"));
        let titled = RawDocument::new(OriginSourceType::Mongodb, "m1", "x").with_metadata(metadata);
        assert_eq!(titled.display_name(), "The Matrix");

        let mut metadata = Metadata::new();
        metadata.insert("file_name".to_string(), json!("notes.md"));
        metadata.insert("title".to_string(), json!("ignored"));
        let named = RawDocument::new(OriginSourceType::Filesystem, "n", "x").with_metadata(metadata);
        assert_eq!(named.display_name(), "notes.md");

        let bare = RawDocument::new(OriginSourceType::Qdrant, "42", "x");
        assert_eq!(bare.display_name(), "origin_42");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "Processed".parse::<RawDocumentStatus>().unwrap(),
            RawDocumentStatus::Processed
        );
        assert!("done".parse::<RawDocumentStatus>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let doc = RawDocument::new(OriginSourceType::Mongodb, "x", "y")
            .with_source_id(Some("conn-1".to_string()));

        assert!(RawDocumentFilter::default().matches(&doc));
        assert!(
            RawDocumentFilter::default()
                .with_source_type(OriginSourceType::Mongodb)
                .with_source_id("conn-1")
                .matches(&doc)
        );
        assert!(
            !RawDocumentFilter::default()
                .with_status(RawDocumentStatus::Failed)
                .matches(&doc)
        );
    }

    #[test]
    fn test_status_counts() {
        let mut counts = StatusCounts::default();
        counts.add(RawDocumentStatus::Processed, 3);
        counts.add(RawDocumentStatus::Failed, 1);

        assert_eq!(counts.processed, 3);
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.total(), 4);
    }
}

//! Ingestion outcome types

use serde::Serialize;

/// Why an origin document was not written again
pub const REASON_DUPLICATE_ORIGIN: &str = "duplicate_origin_id";

/// Result of ingesting one origin document into the raw store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub raw_document_id: String,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl IngestOutcome {
    pub fn stored(raw_document_id: impl Into<String>) -> Self {
        Self {
            raw_document_id: raw_document_id.into(),
            skipped: false,
            reason: None,
        }
    }

    pub fn duplicate(raw_document_id: impl Into<String>) -> Self {
        Self {
            raw_document_id: raw_document_id.into(),
            skipped: true,
            reason: Some(REASON_DUPLICATE_ORIGIN.to_string()),
        }
    }
}

/// Result of ingesting one origin document straight into a semantic collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticIngestOutcome {
    pub origin_id: String,
    /// `database.collection` the chunks were written to
    pub semantic_collection: String,
    pub chunks_stored: usize,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Skipped,
    Failed,
}

/// Per-item entry of a batch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemDetail {
    /// Origin id or raw document id, depending on the batch kind
    pub id: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_stored: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemDetail {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Success,
            raw_document_id: None,
            chunks_stored: None,
            error: None,
        }
    }

    pub fn skipped(id: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Skipped,
            ..Self::success(id)
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Failed,
            error: Some(error.into()),
            ..Self::success(id)
        }
    }

    pub fn with_raw_document_id(mut self, raw_document_id: impl Into<String>) -> Self {
        self.raw_document_id = Some(raw_document_id.into());
        self
    }

    pub fn with_chunks_stored(mut self, chunks_stored: usize) -> Self {
        self.chunks_stored = Some(chunks_stored);
        self
    }
}

/// Aggregate of a batch where every item is attempted independently.
///
/// When the batch is cancelled the remaining items are not attempted, so
/// `successful + skipped + failed` may be less than `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchIngestionResult {
    pub total: usize,
    pub successful: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_chunks_stored: usize,
    pub cancelled: bool,
    pub details: Vec<BatchItemDetail>,
}

impl BatchIngestionResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            successful: 0,
            skipped: 0,
            failed: 0,
            total_chunks_stored: 0,
            cancelled: false,
            details: Vec::with_capacity(total),
        }
    }

    pub fn record(&mut self, detail: BatchItemDetail) {
        match detail.status {
            ItemStatus::Success => self.successful += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Failed => self.failed += 1,
        }
        self.total_chunks_stored += detail.chunks_stored.unwrap_or(0);
        self.details.push(detail);
    }

    pub fn attempted(&self) -> usize {
        self.successful + self.skipped + self.failed
    }
}

/// Result of chunking, embedding and storing one raw document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    pub raw_document_id: String,
    pub chunks_created: usize,
    pub chunks_stored: usize,
    pub status: String,
}

impl ProcessResult {
    pub fn success(raw_document_id: impl Into<String>, created: usize, stored: usize) -> Self {
        Self {
            raw_document_id: raw_document_id.into(),
            chunks_created: created,
            chunks_stored: stored,
            status: "success".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_counts() {
        let mut batch = BatchIngestionResult::new(3);
        batch.record(BatchItemDetail::success("a").with_chunks_stored(4));
        batch.record(BatchItemDetail::skipped("b"));
        batch.record(BatchItemDetail::failed("c", "not found"));

        assert_eq!(batch.total, 3);
        assert_eq!(batch.successful, 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.total_chunks_stored, 4);
        assert_eq!(batch.attempted(), 3);
    }

    #[test]
    fn test_outcome_serialization() {
        let value = serde_json::to_value(IngestOutcome::duplicate("raw-1")).unwrap();
        assert_eq!(value["skipped"], true);
        assert_eq!(value["reason"], "duplicate_origin_id");

        let value = serde_json::to_value(IngestOutcome::stored("raw-2")).unwrap();
        assert!(value.get("reason").is_none());
    }
}

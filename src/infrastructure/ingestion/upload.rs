//! File upload ingestion

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;

use super::IngestionPipeline;
use crate::domain::document::{RawDocument, RawDocumentStatus};
use crate::domain::ingestion::{ProcessResult, TextExtractor};
use crate::domain::origin::OriginSourceType;
use crate::domain::DomainError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Limits applied to every upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPolicy {
    pub max_file_size_mb: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            allowed_extensions: ["pdf", "txt", "docx", "md"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    /// Lowercase extension of an acceptable upload
    pub fn check(&self, file_name: &str, size: usize) -> Result<String, DomainError> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(DomainError::validation("File name cannot be empty"));
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if !self
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&extension))
        {
            return Err(DomainError::validation(format!(
                "File type not allowed: '{}'. Allowed types: {}",
                file_name,
                self.allowed_extensions.join(", ")
            )));
        }

        if size == 0 {
            return Err(DomainError::validation("File is empty"));
        }

        if size as u64 > self.max_file_size_mb * BYTES_PER_MB {
            return Err(DomainError::validation(format!(
                "File too large: {} bytes (max {} MB)",
                size, self.max_file_size_mb
            )));
        }

        Ok(extension)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub raw_document_id: String,
    pub file_name: String,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing: Option<ProcessResult>,
}

/// Writes uploaded files as raw documents and processes them right away.
///
/// The origin id is the SHA-256 of the file bytes, so uploading identical
/// content twice maps to the same raw document.
#[derive(Debug)]
pub struct FileUploadIngestor {
    pipeline: Arc<IngestionPipeline>,
    extractor: Arc<dyn TextExtractor>,
    policy: UploadPolicy,
}

impl FileUploadIngestor {
    pub fn new(
        pipeline: Arc<IngestionPipeline>,
        extractor: Arc<dyn TextExtractor>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            pipeline,
            extractor,
            policy,
        }
    }

    pub async fn upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        target_collection: Option<&str>,
    ) -> Result<UploadOutcome, DomainError> {
        let extension = self.policy.check(file_name, bytes.len())?;
        if !self.extractor.supports(&extension) {
            return Err(DomainError::validation(format!(
                "No text extractor for .{} files",
                extension
            )));
        }

        let text = self.extractor.extract(&extension, bytes)?;
        let origin_id = hex::encode(Sha256::digest(bytes));
        let mime_type = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let metadata = json!({
            "file_name": file_name.trim(),
            "file_type": extension,
            "file_size": bytes.len(),
            "mime_type": mime_type,
        });
        let raw = RawDocument::new(OriginSourceType::FileUpload, &origin_id, text)
            .with_metadata(metadata.as_object().cloned().unwrap_or_default());

        let raw_store = self.pipeline.raw_store();
        let stored = raw_store.upsert(raw, false).await?;

        if stored.was_duplicate {
            let already_processed = raw_store
                .get(&stored.raw_document_id)
                .await?
                .is_some_and(|d| d.status == RawDocumentStatus::Processed);

            if already_processed {
                info!(
                    file_name,
                    raw_document_id = %stored.raw_document_id,
                    "Identical file already ingested"
                );
                return Ok(UploadOutcome {
                    raw_document_id: stored.raw_document_id,
                    file_name: file_name.trim().to_string(),
                    skipped: true,
                    processing: None,
                });
            }
        }

        let processing = self
            .pipeline
            .process_raw_document(&stored.raw_document_id, target_collection)
            .await?;

        Ok(UploadOutcome {
            raw_document_id: stored.raw_document_id,
            file_name: file_name.trim().to_string(),
            skipped: false,
            processing: Some(processing),
        })
    }
}

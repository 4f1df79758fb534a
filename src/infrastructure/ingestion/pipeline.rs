//! Ingestion pipeline service
//!
//! Two paths lead from an origin to searchable vectors:
//! - origin → raw document → chunk → embed → vector store, with the raw
//!   document status tracking each step
//! - origin → semantic chunks, written straight into `<collection>_semantic`

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::chunking::{ChunkingConfig, TextChunker};
use crate::domain::collection::CollectionNamespace;
use crate::domain::document::{
    DocumentChunk, OriginDocument, RawDocument, RawDocumentStatus, SemanticChunk,
};
use crate::domain::embedding::Embedder;
use crate::domain::ingestion::{
    BatchIngestionResult, BatchItemDetail, IngestOutcome, ProcessResult, SemanticIngestOutcome,
    REASON_DUPLICATE_ORIGIN,
};
use crate::domain::origin::{
    OriginConnectionConfig, OriginSource, OriginSourceFactory, OriginSourceType,
};
use crate::domain::store::{RawDocumentRepository, SemanticChunkRepository};
use crate::domain::vector_store::VectorStoreProvider;
use crate::domain::DomainError;
use crate::infrastructure::chunking::prepare_for_chunking;

/// Collaborators of the pipeline
pub struct IngestionPipelineDeps {
    pub raw_store: Arc<dyn RawDocumentRepository>,
    pub semantic_store: Arc<dyn SemanticChunkRepository>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub embedder: Arc<dyn Embedder>,
    pub chunker: Arc<dyn TextChunker>,
    pub origin_factory: Arc<dyn OriginSourceFactory>,
    pub chunking: ChunkingConfig,
    /// Database for semantic collections when the origin names none
    pub default_database: String,
}

/// Stateless orchestrator; all state lives in the stores.
pub struct IngestionPipeline {
    raw_store: Arc<dyn RawDocumentRepository>,
    semantic_store: Arc<dyn SemanticChunkRepository>,
    vector_store: Arc<dyn VectorStoreProvider>,
    embedder: Arc<dyn Embedder>,
    chunker: Arc<dyn TextChunker>,
    origin_factory: Arc<dyn OriginSourceFactory>,
    chunking: ChunkingConfig,
    default_database: String,
    cancel: CancellationToken,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("vector_store", &self.vector_store)
            .field("embedder", &self.embedder)
            .field("chunker", &self.chunker)
            .field("chunking", &self.chunking)
            .field("default_database", &self.default_database)
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    pub fn new(deps: IngestionPipelineDeps) -> Self {
        Self {
            raw_store: deps.raw_store,
            semantic_store: deps.semantic_store,
            vector_store: deps.vector_store,
            embedder: deps.embedder,
            chunker: deps.chunker,
            origin_factory: deps.origin_factory,
            chunking: deps.chunking,
            default_database: deps.default_database,
            cancel: CancellationToken::new(),
        }
    }

    /// Batches stop before the next item once this token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn raw_store(&self) -> &Arc<dyn RawDocumentRepository> {
        &self.raw_store
    }

    // ---- origin → raw document ----

    /// Fetch one origin document and store it as a pending raw document.
    ///
    /// The write is an upsert keyed by `(origin_id, origin_source_type)`, so
    /// repeated or concurrent calls leave exactly one raw document.
    pub async fn ingest_origin_document(
        &self,
        source_type: OriginSourceType,
        origin_id: &str,
        source_id: Option<&str>,
        config: Option<&OriginConnectionConfig>,
        skip_duplicates: bool,
    ) -> Result<IngestOutcome, DomainError> {
        if let Some(outcome) = self
            .existing_outcome(origin_id, source_type, skip_duplicates)
            .await?
        {
            return Ok(outcome);
        }

        let origin = self.open_origin(source_type, config).await?;
        let result = self
            .ingest_from(origin.as_ref(), origin_id, source_id, skip_duplicates)
            .await;
        origin.close().await;
        result
    }

    /// Ingest many ids through one origin connection. Failures are recorded
    /// per item and never abort the batch.
    pub async fn ingest_origin_documents_batch(
        &self,
        source_type: OriginSourceType,
        origin_ids: &[String],
        source_id: Option<&str>,
        config: Option<&OriginConnectionConfig>,
        skip_duplicates: bool,
    ) -> Result<BatchIngestionResult, DomainError> {
        let mut result = BatchIngestionResult::new(origin_ids.len());
        if origin_ids.is_empty() {
            return Ok(result);
        }

        let origin = self.open_origin(source_type, config).await?;

        for origin_id in origin_ids {
            if self.cancel.is_cancelled() {
                warn!(
                    attempted = result.attempted(),
                    total = result.total,
                    "Batch ingestion cancelled"
                );
                result.cancelled = true;
                break;
            }

            let outcome = match self
                .existing_outcome(origin_id, source_type, skip_duplicates)
                .await
            {
                Ok(Some(outcome)) => Ok(outcome),
                Ok(None) => {
                    self.ingest_from(origin.as_ref(), origin_id, source_id, skip_duplicates)
                        .await
                }
                Err(e) => Err(e),
            };

            let detail = match outcome {
                Ok(outcome) if outcome.skipped => {
                    BatchItemDetail::skipped(origin_id).with_raw_document_id(outcome.raw_document_id)
                }
                Ok(outcome) => {
                    BatchItemDetail::success(origin_id).with_raw_document_id(outcome.raw_document_id)
                }
                Err(e) => {
                    error!(origin_id = %origin_id, error = %e, "Failed to ingest origin document");
                    BatchItemDetail::failed(origin_id, e.to_string())
                }
            };
            result.record(detail);
        }

        origin.close().await;

        info!(
            source_type = %source_type,
            total = result.total,
            successful = result.successful,
            skipped = result.skipped,
            failed = result.failed,
            "Batch ingestion finished"
        );
        Ok(result)
    }

    async fn existing_outcome(
        &self,
        origin_id: &str,
        source_type: OriginSourceType,
        skip_duplicates: bool,
    ) -> Result<Option<IngestOutcome>, DomainError> {
        if !skip_duplicates {
            return Ok(None);
        }

        let existing = self
            .raw_store
            .get_by_origin_id(origin_id, Some(source_type))
            .await?;

        Ok(existing.map(|document| {
            debug!(
                origin_id,
                raw_document_id = %document.raw_document_id,
                "Origin document already ingested"
            );
            IngestOutcome::duplicate(document.raw_document_id)
        }))
    }

    async fn open_origin(
        &self,
        source_type: OriginSourceType,
        config: Option<&OriginConnectionConfig>,
    ) -> Result<Arc<dyn OriginSource>, DomainError> {
        if source_type == OriginSourceType::FileUpload {
            return Err(DomainError::validation(
                "file_upload documents are stored directly; use the upload path",
            ));
        }

        let config = config.ok_or_else(|| {
            DomainError::validation(format!(
                "connection_config is required for {} origins",
                source_type
            ))
        })?;

        self.origin_factory.create(source_type, config).await
    }

    async fn ingest_from(
        &self,
        origin: &dyn OriginSource,
        origin_id: &str,
        source_id: Option<&str>,
        skip_duplicates: bool,
    ) -> Result<IngestOutcome, DomainError> {
        let document = origin.get_document(origin_id).await?.ok_or_else(|| {
            DomainError::not_found(format!("Document not found in origin: {}", origin_id))
        })?;

        let source_type = origin.source_type();
        let raw = RawDocument::new(source_type, origin_id, document.content.clone())
            .with_source_id(source_id.map(str::to_string))
            .with_metadata(origin_metadata(&document));

        match self.raw_store.upsert(raw, !skip_duplicates).await {
            Ok(outcome) if outcome.was_duplicate && skip_duplicates => {
                Ok(IngestOutcome::duplicate(outcome.raw_document_id))
            }
            Ok(outcome) => {
                info!(
                    origin_id,
                    raw_document_id = %outcome.raw_document_id,
                    replaced = outcome.was_duplicate,
                    "Stored raw document"
                );
                Ok(IngestOutcome::stored(outcome.raw_document_id))
            }
            Err(e) if e.is_duplicate_key() => {
                warn!(origin_id, "Concurrent ingestion of the same origin document");
                match self
                    .raw_store
                    .get_by_origin_id(origin_id, Some(source_type))
                    .await?
                {
                    Some(existing) => Ok(IngestOutcome::duplicate(existing.raw_document_id)),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    // ---- raw document → vectors ----

    /// Chunk, embed and store one raw document.
    ///
    /// Status moves to `processing`, then to `processed` on success. Any
    /// failing step marks the document `failed` with the error message and
    /// returns the error.
    pub async fn process_raw_document(
        &self,
        raw_document_id: &str,
        target_collection: Option<&str>,
    ) -> Result<ProcessResult, DomainError> {
        let raw = self.raw_store.get(raw_document_id).await?.ok_or_else(|| {
            DomainError::not_found(format!("Raw document not found: {}", raw_document_id))
        })?;

        self.raw_store
            .update_status(raw_document_id, RawDocumentStatus::Processing, None)
            .await?;

        match self.run_stages(&raw, target_collection).await {
            Ok((created, stored)) => {
                self.raw_store
                    .update_status(raw_document_id, RawDocumentStatus::Processed, None)
                    .await?;
                info!(
                    raw_document_id,
                    chunks_created = created,
                    chunks_stored = stored,
                    "Processed raw document"
                );
                Ok(ProcessResult::success(raw_document_id, created, stored))
            }
            Err(e) => {
                error!(raw_document_id, error = %e, "Processing raw document failed");
                if let Err(status_error) = self
                    .raw_store
                    .update_status(
                        raw_document_id,
                        RawDocumentStatus::Failed,
                        Some(e.to_string()),
                    )
                    .await
                {
                    error!(raw_document_id, error = %status_error, "Failed to record failure status");
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        raw: &RawDocument,
        target_collection: Option<&str>,
    ) -> Result<(usize, usize), DomainError> {
        let chunks = self.chunk_raw_document(raw)?;
        let created = chunks.len();
        let chunks = self.embed_chunks(chunks).await?;
        let stored = self
            .vector_store
            .store_chunks(&chunks, target_collection)
            .await?;
        Ok((created, stored))
    }

    /// Split a raw document into chunks without embeddings
    pub fn chunk_raw_document(&self, raw: &RawDocument) -> Result<Vec<DocumentChunk>, DomainError> {
        let content = prepare_for_chunking(&raw.raw_content, &raw.content_type);
        let pieces = self.chunker.chunk(&content, &self.chunking)?;

        if pieces.is_empty() {
            return Err(DomainError::extraction(format!(
                "No chunks created from raw document {}: the content has no extractable text \
                 (for scanned PDFs, run OCR first)",
                raw.raw_document_id
            )));
        }

        let file_name = raw.display_name();
        let mut metadata = raw.metadata.clone();
        metadata.insert(
            "origin_source_type".to_string(),
            Value::String(raw.origin_source_type.to_string()),
        );

        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(index, piece)| DocumentChunk {
                chunk_id: format!("{}_chunk_{}", raw.raw_document_id, index),
                document_id: raw.raw_document_id.clone(),
                file_name: file_name.clone(),
                chunk_index: index,
                content: piece.content,
                line_start: piece.line_start,
                line_end: piece.line_end,
                embedding: None,
                metadata: metadata.clone(),
                origin_id: Some(raw.origin_id.clone()),
                raw_document_id: Some(raw.raw_document_id.clone()),
            })
            .collect())
    }

    /// Attach one embedding per chunk, in order. A missing embedding is an error.
    pub async fn embed_chunks(
        &self,
        mut chunks: Vec<DocumentChunk>,
    ) -> Result<Vec<DocumentChunk>, DomainError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embed_texts(&texts).await?;

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = Some(embedding);
        }

        if let Some(chunk) = chunks.iter().find(|c| !c.has_embedding()) {
            return Err(DomainError::embedding(format!(
                "Chunk {} has no embedding",
                chunk.chunk_id
            )));
        }

        Ok(chunks)
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let embeddings = self.embedder.embed_batch(texts).await?;

        if embeddings.len() != texts.len() {
            return Err(DomainError::embedding(format!(
                "Embedding count mismatch: {} chunks, {} embeddings",
                texts.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }

    /// Process several raw documents; failures are recorded per item.
    pub async fn process_multiple_raw_documents(
        &self,
        raw_document_ids: &[String],
        target_collection: Option<&str>,
    ) -> BatchIngestionResult {
        let mut result = BatchIngestionResult::new(raw_document_ids.len());

        for raw_document_id in raw_document_ids {
            if self.cancel.is_cancelled() {
                warn!(attempted = result.attempted(), "Raw document processing cancelled");
                result.cancelled = true;
                break;
            }

            let detail = match self
                .process_raw_document(raw_document_id, target_collection)
                .await
            {
                Ok(processed) => BatchItemDetail::success(raw_document_id)
                    .with_raw_document_id(raw_document_id)
                    .with_chunks_stored(processed.chunks_stored),
                Err(e) => BatchItemDetail::failed(raw_document_id, e.to_string())
                    .with_raw_document_id(raw_document_id),
            };
            result.record(detail);
        }

        result
    }

    // ---- origin → semantic chunks ----

    /// Chunk and embed one origin document into its semantic collection.
    ///
    /// With `skip_duplicates`, any existing chunk for the origin id skips the
    /// document even if the origin changed since.
    pub async fn ingest_origin_document_to_semantic(
        &self,
        source_type: OriginSourceType,
        origin_id: &str,
        config: &OriginConnectionConfig,
        skip_duplicates: bool,
    ) -> Result<SemanticIngestOutcome, DomainError> {
        let origin = self.open_origin(source_type, Some(config)).await?;

        let result: Result<SemanticIngestOutcome, DomainError> = async {
            let document = origin.get_document(origin_id).await?.ok_or_else(|| {
                DomainError::not_found(format!("Document not found in origin: {}", origin_id))
            })?;
            self.store_semantic(&document, config, skip_duplicates).await
        }
        .await;

        origin.close().await;
        result
    }

    /// Semantic ingestion of a whole origin collection, or of the documents
    /// changed since `since`.
    pub async fn ingest_origin_collection_to_semantic(
        &self,
        source_type: OriginSourceType,
        config: &OriginConnectionConfig,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
        skip_duplicates: bool,
    ) -> Result<BatchIngestionResult, DomainError> {
        let origin = self.open_origin(source_type, Some(config)).await?;

        let fetched = match since {
            Some(since) => origin.fetch_new_documents(since, limit).await,
            None => origin.fetch_documents(limit, 0).await,
        };
        origin.close().await;
        let documents = fetched?;

        info!(
            source_type = %source_type,
            documents = documents.len(),
            incremental = since.is_some(),
            "Syncing origin collection to semantic store"
        );

        let mut result = BatchIngestionResult::new(documents.len());
        for document in &documents {
            if self.cancel.is_cancelled() {
                warn!(attempted = result.attempted(), "Semantic sync cancelled");
                result.cancelled = true;
                break;
            }

            let detail = match self.store_semantic(document, config, skip_duplicates).await {
                Ok(outcome) if outcome.skipped => BatchItemDetail::skipped(&document.origin_id),
                Ok(outcome) => BatchItemDetail::success(&document.origin_id)
                    .with_chunks_stored(outcome.chunks_stored),
                Err(e) => {
                    error!(origin_id = %document.origin_id, error = %e, "Semantic ingestion failed");
                    BatchItemDetail::failed(&document.origin_id, e.to_string())
                }
            };
            result.record(detail);
        }

        Ok(result)
    }

    fn semantic_namespace(
        &self,
        document: &OriginDocument,
        config: &OriginConnectionConfig,
    ) -> Result<CollectionNamespace, DomainError> {
        let database = document
            .origin_db
            .clone()
            .or_else(|| config.database_name.clone())
            .unwrap_or_else(|| self.default_database.clone());
        let collection = document
            .origin_collection
            .clone()
            .or_else(|| config.collection_name.clone())
            .ok_or_else(|| {
                DomainError::validation("Semantic ingestion requires an origin collection name")
            })?;

        Ok(CollectionNamespace::new(database, collection).semantic())
    }

    async fn store_semantic(
        &self,
        document: &OriginDocument,
        config: &OriginConnectionConfig,
        skip_duplicates: bool,
    ) -> Result<SemanticIngestOutcome, DomainError> {
        let namespace = self.semantic_namespace(document, config)?;
        let origin_id = document.origin_id.as_str();

        if skip_duplicates && self.semantic_store.has_origin(&namespace, origin_id).await? {
            debug!(origin_id, namespace = %namespace, "Semantic chunks already exist");
            return Ok(SemanticIngestOutcome {
                origin_id: origin_id.to_string(),
                semantic_collection: namespace.to_string(),
                chunks_stored: 0,
                skipped: true,
                reason: Some(REASON_DUPLICATE_ORIGIN.to_string()),
            });
        }

        let content = prepare_for_chunking(&document.content, "text");
        let pieces = self.chunker.chunk(&content, &self.chunking)?;
        if pieces.is_empty() {
            return Err(DomainError::extraction(format!(
                "No chunks created from origin document {}: no extractable text",
                origin_id
            )));
        }

        let texts: Vec<String> = pieces.iter().map(|p| p.content.clone()).collect();
        let embeddings = self.embed_texts(&texts).await?;

        let mut chunks = Vec::with_capacity(pieces.len());
        for (index, (piece, embedding)) in pieces.into_iter().zip(embeddings).enumerate() {
            if embedding.is_empty() {
                return Err(DomainError::embedding(format!(
                    "Chunk {} of origin document {} has no embedding",
                    index, origin_id
                )));
            }

            let mut metadata = document.metadata.clone();
            metadata.insert("origin_collection".into(), Value::from(document.origin_collection.clone()));
            metadata.insert("origin_db".into(), Value::from(document.origin_db.clone()));
            metadata.insert("line_start".into(), Value::from(piece.line_start));
            metadata.insert("line_end".into(), Value::from(piece.line_end));
            metadata.insert("chunk_index".into(), Value::from(index));

            chunks.push(SemanticChunk {
                origin_id: origin_id.to_string(),
                chunk_id: format!("chunk_{}", index),
                chunk_text: piece.content,
                embedding,
                metadata,
            });
        }

        if !skip_duplicates {
            self.semantic_store.delete_by_origin(&namespace, origin_id).await?;
        }
        let stored = self.semantic_store.upsert_chunks(&namespace, chunks).await?;

        info!(origin_id, namespace = %namespace, chunks = stored, "Stored semantic chunks");
        Ok(SemanticIngestOutcome {
            origin_id: origin_id.to_string(),
            semantic_collection: namespace.to_string(),
            chunks_stored: stored,
            skipped: false,
            reason: None,
        })
    }
}

fn origin_metadata(document: &OriginDocument) -> crate::domain::document::Metadata {
    let mut metadata = document.metadata.clone();
    if let Some(collection) = &document.origin_collection {
        metadata.insert("origin_collection".into(), Value::String(collection.clone()));
    }
    if let Some(database) = &document.origin_db {
        metadata.insert("origin_db".into(), Value::String(database.clone()));
    }
    metadata
}

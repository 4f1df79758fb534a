//! In-memory stores backing the pipeline tests

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::collection::CollectionNamespace;
use crate::domain::document::{
    RawDocument, RawDocumentFilter, RawDocumentStatus, SemanticChunk, StatusCounts, UpsertOutcome,
};
use crate::domain::origin::OriginSourceType;
use crate::domain::store::{RawDocumentRepository, SemanticChunkRepository};
use crate::domain::DomainError;

/// Raw documents keyed by id, with `(origin_id, origin_source_type)` kept
/// unique under a single write lock.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRawDocumentRepository {
    documents: Arc<RwLock<HashMap<String, RawDocument>>>,
}

impl InMemoryRawDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

fn same_origin(document: &RawDocument, origin_id: &str, source_type: Option<OriginSourceType>) -> bool {
    document.origin_id == origin_id && source_type.is_none_or(|t| t == document.origin_source_type)
}

#[async_trait]
impl RawDocumentRepository for InMemoryRawDocumentRepository {
    async fn upsert(
        &self,
        document: RawDocument,
        overwrite: bool,
    ) -> Result<UpsertOutcome, DomainError> {
        let mut documents = self.documents.write().await;

        let existing = documents.values_mut().find(|d| {
            same_origin(d, &document.origin_id, Some(document.origin_source_type))
        });

        if let Some(existing) = existing {
            if overwrite {
                existing.raw_content = document.raw_content;
                existing.content_type = document.content_type;
                existing.metadata = document.metadata;
                existing.origin_source_id = document.origin_source_id;
                existing.status = RawDocumentStatus::Pending;
                existing.error_message = None;
                existing.updated_at = Utc::now();
            }

            return Ok(UpsertOutcome {
                raw_document_id: existing.raw_document_id.clone(),
                was_duplicate: true,
            });
        }

        let raw_document_id = document.raw_document_id.clone();
        documents.insert(raw_document_id.clone(), document);

        Ok(UpsertOutcome {
            raw_document_id,
            was_duplicate: false,
        })
    }

    async fn get(&self, raw_document_id: &str) -> Result<Option<RawDocument>, DomainError> {
        Ok(self.documents.read().await.get(raw_document_id).cloned())
    }

    async fn get_by_origin_id(
        &self,
        origin_id: &str,
        source_type: Option<OriginSourceType>,
    ) -> Result<Option<RawDocument>, DomainError> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .find(|d| same_origin(d, origin_id, source_type))
            .cloned())
    }

    async fn is_origin_ingested(
        &self,
        origin_id: &str,
        source_type: Option<OriginSourceType>,
    ) -> Result<bool, DomainError> {
        Ok(self.get_by_origin_id(origin_id, source_type).await?.is_some())
    }

    async fn list(
        &self,
        filter: RawDocumentFilter,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<RawDocument>, DomainError> {
        let documents = self.documents.read().await;

        let mut matching: Vec<RawDocument> = documents
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.raw_document_id.cmp(&b.raw_document_id))
        });

        Ok(matching.into_iter().skip(skip).take(limit).collect())
    }

    async fn update_status(
        &self,
        raw_document_id: &str,
        status: RawDocumentStatus,
        error_message: Option<String>,
    ) -> Result<(), DomainError> {
        let mut documents = self.documents.write().await;

        let document = documents.get_mut(raw_document_id).ok_or_else(|| {
            DomainError::not_found(format!("Raw document {} not found", raw_document_id))
        })?;
        document.set_status(status, error_message);

        Ok(())
    }

    async fn delete(&self, raw_document_id: &str) -> Result<bool, DomainError> {
        Ok(self
            .documents
            .write()
            .await
            .remove(raw_document_id)
            .is_some())
    }

    async fn count_by_status(&self) -> Result<StatusCounts, DomainError> {
        let mut counts = StatusCounts::default();
        for document in self.documents.read().await.values() {
            counts.add(document.status, 1);
        }
        Ok(counts)
    }
}

/// Semantic chunks per namespace, keyed by `origin_id:chunk_id`
#[derive(Debug, Default, Clone)]
pub struct InMemorySemanticChunkRepository {
    collections: Arc<RwLock<HashMap<CollectionNamespace, BTreeMap<String, SemanticChunk>>>>,
}

impl InMemorySemanticChunkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunks stored in a namespace, ordered by key
    pub async fn chunks(&self, namespace: &CollectionNamespace) -> Vec<SemanticChunk> {
        self.collections
            .read()
            .await
            .get(namespace)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SemanticChunkRepository for InMemorySemanticChunkRepository {
    async fn upsert_chunks(
        &self,
        namespace: &CollectionNamespace,
        chunks: Vec<SemanticChunk>,
    ) -> Result<usize, DomainError> {
        let count = chunks.len();
        let mut collections = self.collections.write().await;
        let collection = collections.entry(namespace.clone()).or_default();

        for chunk in chunks {
            collection.insert(chunk.key(), chunk);
        }

        Ok(count)
    }

    async fn has_origin(
        &self,
        namespace: &CollectionNamespace,
        origin_id: &str,
    ) -> Result<bool, DomainError> {
        Ok(self
            .collections
            .read()
            .await
            .get(namespace)
            .is_some_and(|c| c.values().any(|chunk| chunk.origin_id == origin_id)))
    }

    async fn delete_by_origin(
        &self,
        namespace: &CollectionNamespace,
        origin_id: &str,
    ) -> Result<u64, DomainError> {
        let mut collections = self.collections.write().await;
        let Some(collection) = collections.get_mut(namespace) else {
            return Ok(0);
        };

        let before = collection.len();
        collection.retain(|_, chunk| chunk.origin_id != origin_id);
        Ok((before - collection.len()) as u64)
    }

    async fn count(&self, namespace: &CollectionNamespace) -> Result<u64, DomainError> {
        Ok(self
            .collections
            .read()
            .await
            .get(namespace)
            .map(|c| c.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::Metadata;

    fn raw(origin_id: &str, content: &str) -> RawDocument {
        RawDocument::new(OriginSourceType::Mongodb, origin_id, content)
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let repo = InMemoryRawDocumentRepository::new();

        let first = repo.upsert(raw("o1", "v1"), false).await.unwrap();
        let second = repo.upsert(raw("o1", "v2"), false).await.unwrap();

        assert!(!first.was_duplicate);
        assert!(second.was_duplicate);
        assert_eq!(first.raw_document_id, second.raw_document_id);
        assert_eq!(repo.len().await, 1);

        let stored = repo.get(&first.raw_document_id).await.unwrap().unwrap();
        assert_eq!(stored.raw_content, "v1");
    }

    #[tokio::test]
    async fn test_upsert_overwrite_keeps_id_and_resets_status() {
        let repo = InMemoryRawDocumentRepository::new();
        let first = repo.upsert(raw("o1", "v1"), false).await.unwrap();
        repo.update_status(&first.raw_document_id, RawDocumentStatus::Failed, Some("boom".into()))
            .await
            .unwrap();

        let second = repo.upsert(raw("o1", "v2"), true).await.unwrap();
        let stored = repo.get(&second.raw_document_id).await.unwrap().unwrap();

        assert_eq!(second.raw_document_id, first.raw_document_id);
        assert_eq!(stored.raw_content, "v2");
        assert_eq!(stored.status, RawDocumentStatus::Pending);
        assert_eq!(stored.error_message, None);
    }

    #[tokio::test]
    async fn test_same_origin_id_different_source_types() {
        let repo = InMemoryRawDocumentRepository::new();
        repo.upsert(raw("1", "a"), false).await.unwrap();
        let other = repo
            .upsert(RawDocument::new(OriginSourceType::Qdrant, "1", "b"), false)
            .await
            .unwrap();

        assert!(!other.was_duplicate);
        assert!(repo.is_origin_ingested("1", Some(OriginSourceType::Qdrant)).await.unwrap());
        assert!(repo.is_origin_ingested("1", None).await.unwrap());
        assert!(!repo.is_origin_ingested("2", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_updates_and_counts() {
        let repo = InMemoryRawDocumentRepository::new();
        let a = repo.upsert(raw("a", "x"), false).await.unwrap();
        repo.upsert(raw("b", "y"), false).await.unwrap();

        repo.update_status(&a.raw_document_id, RawDocumentStatus::Processed, None)
            .await
            .unwrap();
        let stored = repo.get(&a.raw_document_id).await.unwrap().unwrap();
        assert!(stored.processed_at.is_some());

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts.processed, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.failed, 0);

        let err = repo
            .update_status("missing", RawDocumentStatus::Failed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let repo = InMemoryRawDocumentRepository::new();
        let mut older = raw("old", "x");
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        repo.upsert(older, false).await.unwrap();
        repo.upsert(raw("new", "y"), false).await.unwrap();
        repo.upsert(RawDocument::new(OriginSourceType::Filesystem, "f", "z"), false)
            .await
            .unwrap();

        let mongo = RawDocumentFilter::default().with_source_type(OriginSourceType::Mongodb);
        let listed = repo.list(mongo, 10, 0).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|d| d.origin_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        let page = repo.list(RawDocumentFilter::default(), 1, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].origin_id, "old");
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryRawDocumentRepository::new();
        let a = repo.upsert(raw("a", "x"), false).await.unwrap();

        assert!(repo.delete(&a.raw_document_id).await.unwrap());
        assert!(!repo.delete(&a.raw_document_id).await.unwrap());
    }

    fn semantic(origin_id: &str, chunk_id: &str, text: &str) -> SemanticChunk {
        SemanticChunk {
            origin_id: origin_id.to_string(),
            chunk_id: chunk_id.to_string(),
            chunk_text: text.to_string(),
            embedding: vec![0.1, 0.2],
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn test_semantic_upsert_overwrites_by_composite_key() {
        let repo = InMemorySemanticChunkRepository::new();
        let ns = CollectionNamespace::new("db", "movies_semantic");

        repo.upsert_chunks(&ns, vec![semantic("o1", "chunk_0", "a"), semantic("o1", "chunk_1", "b")])
            .await
            .unwrap();
        repo.upsert_chunks(&ns, vec![semantic("o1", "chunk_0", "a2")])
            .await
            .unwrap();

        assert_eq!(repo.count(&ns).await.unwrap(), 2);
        assert_eq!(repo.chunks(&ns).await[0].chunk_text, "a2");
        assert!(repo.has_origin(&ns, "o1").await.unwrap());
        assert!(!repo.has_origin(&CollectionNamespace::new("db", "other"), "o1").await.unwrap());

        assert_eq!(repo.delete_by_origin(&ns, "o1").await.unwrap(), 2);
        assert_eq!(repo.count(&ns).await.unwrap(), 0);
    }
}

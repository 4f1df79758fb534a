//! In-memory vector store with brute-force cosine search

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{chunk_record, cosine_similarity, require_embedding};
use crate::domain::document::DocumentChunk;
use crate::domain::retrieval::RetrievalDiagnosis;
use crate::domain::vector_store::{VectorSearchResult, VectorStoreProvider};
use crate::domain::DomainError;

const PROVIDER: &str = "memory";
const DEFAULT_COLLECTION: &str = "documents";

/// Keeps chunks per collection for pipeline tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorStore {
    collections: Arc<RwLock<HashMap<String, Vec<DocumentChunk>>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection_name(collection: Option<&str>) -> String {
        collection.unwrap_or(DEFAULT_COLLECTION).to_string()
    }

    async fn remove_where<F>(&self, collection: Option<&str>, predicate: F) -> u64
    where
        F: Fn(&DocumentChunk) -> bool,
    {
        let mut collections = self.collections.write().await;
        let Some(chunks) = collections.get_mut(&Self::collection_name(collection)) else {
            return 0;
        };

        let before = chunks.len();
        chunks.retain(|c| !predicate(c));
        (before - chunks.len()) as u64
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    fn provider_type(&self) -> &'static str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        true
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        collection: Option<&str>,
    ) -> Vec<VectorSearchResult> {
        let collections = self.collections.read().await;
        let Some(chunks) = collections.get(&Self::collection_name(collection)) else {
            return Vec::new();
        };

        let mut results: Vec<VectorSearchResult> = chunks
            .iter()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_deref()?;
                let score = cosine_similarity(query_embedding, embedding);
                Some(VectorSearchResult::from_record(&chunk_record(chunk), score))
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        results
    }

    /// Replaces chunks with the same id
    async fn store_chunks(
        &self,
        chunks: &[DocumentChunk],
        collection: Option<&str>,
    ) -> Result<usize, DomainError> {
        for chunk in chunks {
            require_embedding(PROVIDER, chunk)?;
        }

        let mut collections = self.collections.write().await;
        let stored = collections
            .entry(Self::collection_name(collection))
            .or_default();

        for chunk in chunks {
            stored.retain(|c| c.chunk_id != chunk.chunk_id);
            stored.push(chunk.clone());
        }

        Ok(chunks.len())
    }

    async fn delete_by_raw_document_id(
        &self,
        raw_document_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        Ok(self
            .remove_where(collection, |c| {
                c.raw_document_id.as_deref() == Some(raw_document_id)
            })
            .await)
    }

    async fn delete_by_origin_id(
        &self,
        origin_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        Ok(self
            .remove_where(collection, |c| c.origin_id.as_deref() == Some(origin_id))
            .await)
    }

    async fn count_chunks(&self, collection: Option<&str>) -> Result<u64, DomainError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&Self::collection_name(collection))
            .map(|c| c.len() as u64)
            .unwrap_or(0))
    }

    async fn diagnose(
        &self,
        query_embedding: &[f32],
        collection: Option<&str>,
    ) -> RetrievalDiagnosis {
        let name = Self::collection_name(collection);
        let collections = self.collections.read().await;
        let chunks = collections.get(&name).map(Vec::as_slice).unwrap_or_default();

        if chunks.is_empty() {
            return RetrievalDiagnosis::EmptyCollection { collection: name };
        }

        match chunks.iter().find_map(|c| c.embedding.as_ref()) {
            None => RetrievalDiagnosis::NoEmbeddings {
                collection: name,
                documents: chunks.len() as u64,
            },
            Some(stored) if stored.len() != query_embedding.len() => {
                RetrievalDiagnosis::DimensionMismatch {
                    collection: name,
                    stored: stored.len(),
                    query: query_embedding.len(),
                }
            }
            Some(_) => RetrievalDiagnosis::NoRelevantContent,
        }
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::vector_store::fixtures::chunk;

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = InMemoryVectorStore::new();
        store
            .store_chunks(
                &[
                    chunk("a", "alpha", vec![1.0, 0.0]),
                    chunk("b", "beta", vec![0.7, 0.7]),
                    chunk("c", "gamma", vec![0.0, 1.0]),
                ],
                Some("docs"),
            )
            .await
            .unwrap();

        let results = store.vector_search(&[1.0, 0.0], 2, Some("docs")).await;
        let ids: Vec<&str> = results.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(results[0].file_name, "notes.md");
        assert!(store.vector_search(&[1.0, 0.0], 2, Some("missing")).await.is_empty());
    }

    #[tokio::test]
    async fn test_store_replaces_same_chunk_id() {
        let store = InMemoryVectorStore::new();
        store.store_chunks(&[chunk("a", "v1", vec![1.0])], None).await.unwrap();
        store.store_chunks(&[chunk("a", "v2", vec![1.0])], None).await.unwrap();

        assert_eq!(store.count_chunks(None).await.unwrap(), 1);
        assert_eq!(store.vector_search(&[1.0], 1, None).await[0].content, "v2");
    }

    #[tokio::test]
    async fn test_store_rejects_missing_embedding() {
        let store = InMemoryVectorStore::new();
        let mut missing = chunk("a", "text", vec![]);
        missing.embedding = None;

        assert!(store.store_chunks(&[missing], None).await.is_err());
        assert_eq!(store.count_chunks(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_ids() {
        let store = InMemoryVectorStore::new();
        let mut other = chunk("b", "text", vec![1.0]);
        other.raw_document_id = Some("doc-2".to_string());
        other.origin_id = Some("origin-2".to_string());
        store
            .store_chunks(&[chunk("a", "text", vec![1.0]), other], None)
            .await
            .unwrap();

        assert_eq!(store.delete_by_raw_document_id("doc-1", None).await.unwrap(), 1);
        assert_eq!(store.delete_by_origin_id("origin-2", None).await.unwrap(), 1);
        assert_eq!(store.count_chunks(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_diagnose() {
        let store = InMemoryVectorStore::new();
        assert!(matches!(
            store.diagnose(&[1.0], None).await,
            RetrievalDiagnosis::EmptyCollection { .. }
        ));

        store.store_chunks(&[chunk("a", "x", vec![1.0, 0.0])], None).await.unwrap();
        assert_eq!(
            store.diagnose(&[1.0, 0.0, 0.0], None).await,
            RetrievalDiagnosis::DimensionMismatch {
                collection: "documents".to_string(),
                stored: 2,
                query: 3,
            }
        );
        assert!(store.diagnose(&[1.0, 0.0], None).await.is_healthy());
    }
}

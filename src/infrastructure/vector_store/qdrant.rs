//! Qdrant vector store provider

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::{chunk_record, require_embedding};
use crate::domain::document::DocumentChunk;
use crate::domain::retrieval::RetrievalDiagnosis;
use crate::domain::vector_store::{VectorSearchResult, VectorStoreProvider};
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;
use crate::infrastructure::qdrant::{point_id, QdrantClient};

const PROVIDER: &str = "qdrant";
const DEFAULT_COLLECTION: &str = "documents";

#[derive(Debug)]
pub struct QdrantVectorStore {
    client: QdrantClient,
    default_collection: String,
}

impl QdrantVectorStore {
    pub fn new(http: Arc<dyn HttpClientTrait>, uri: &str, api_key: Option<String>) -> Self {
        Self {
            client: QdrantClient::new(http, uri, api_key),
            default_collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn with_default_collection(mut self, collection: impl Into<String>) -> Self {
        self.default_collection = collection.into();
        self
    }

    fn collection<'a>(&'a self, collection: Option<&'a str>) -> &'a str {
        collection.unwrap_or(&self.default_collection)
    }

    fn point(chunk: &DocumentChunk) -> Result<Value, DomainError> {
        let embedding = require_embedding(PROVIDER, chunk)?;
        Ok(json!({
            "id": point_id(&chunk.chunk_id),
            "vector": embedding,
            "payload": chunk_record(chunk),
        }))
    }
}

#[async_trait]
impl VectorStoreProvider for QdrantVectorStore {
    fn provider_type(&self) -> &'static str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        match self.client.list_collections().await {
            Ok(_) => true,
            Err(e) => {
                warn!(url = %self.client.base_url(), error = %e, "Qdrant unreachable");
                false
            }
        }
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        self.client.list_collections().await
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        collection: Option<&str>,
    ) -> Vec<VectorSearchResult> {
        let collection = self.collection(collection);

        match self.client.search(collection, query_embedding, top_k).await {
            Ok(points) => points
                .iter()
                .map(|point| VectorSearchResult::from_record(&point.payload, point.score))
                .collect(),
            Err(e) => {
                error!(collection, error = %e, "Qdrant search failed");
                Vec::new()
            }
        }
    }

    async fn store_chunks(
        &self,
        chunks: &[DocumentChunk],
        collection: Option<&str>,
    ) -> Result<usize, DomainError> {
        let Some(first) = chunks.first() else {
            return Ok(0);
        };
        let collection = self.collection(collection);
        let points = chunks.iter().map(Self::point).collect::<Result<Vec<_>, _>>()?;

        if self.client.collection_info(collection).await?.is_none() {
            let dimension = require_embedding(PROVIDER, first)?.len();
            self.client.create_collection(collection, dimension).await?;
            info!(collection, dimension, "Created Qdrant collection");
        }

        self.client.upsert(collection, points).await?;
        Ok(chunks.len())
    }

    async fn delete_by_raw_document_id(
        &self,
        raw_document_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        let collection = self.collection(collection);
        let before = self.client.count(collection).await?;
        self.client
            .delete_matching(collection, "raw_document_id", raw_document_id)
            .await?;
        let after = self.client.count(collection).await?;
        Ok(before.saturating_sub(after))
    }

    async fn delete_by_origin_id(
        &self,
        origin_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        let collection = self.collection(collection);
        let before = self.client.count(collection).await?;
        self.client
            .delete_matching(collection, "origin_id", origin_id)
            .await?;
        let after = self.client.count(collection).await?;
        Ok(before.saturating_sub(after))
    }

    async fn count_chunks(&self, collection: Option<&str>) -> Result<u64, DomainError> {
        self.client.count(self.collection(collection)).await
    }

    async fn diagnose(
        &self,
        query_embedding: &[f32],
        collection: Option<&str>,
    ) -> RetrievalDiagnosis {
        let collection = self.collection(collection).to_string();

        let info = match self.client.collection_info(&collection).await {
            Ok(Some(info)) => info,
            Ok(None) => return RetrievalDiagnosis::EmptyCollection { collection },
            Err(e) => {
                return RetrievalDiagnosis::SearchError {
                    message: e.to_string(),
                }
            }
        };

        match self.client.count(&collection).await {
            Ok(0) => return RetrievalDiagnosis::EmptyCollection { collection },
            Ok(_) => {}
            Err(e) => {
                return RetrievalDiagnosis::SearchError {
                    message: e.to_string(),
                }
            }
        }

        match QdrantClient::vector_size(&info) {
            Some(stored) if stored != query_embedding.len() => RetrievalDiagnosis::DimensionMismatch {
                collection,
                stored,
                query: query_embedding.len(),
            },
            _ => RetrievalDiagnosis::NoRelevantContent,
        }
    }

    async fn close(&self) {}
}

//! Pinecone vector store provider

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::{chunk_record, require_embedding};
use crate::domain::document::{DocumentChunk, Metadata};
use crate::domain::retrieval::RetrievalDiagnosis;
use crate::domain::vector_store::{coerce_score, VectorSearchResult, VectorStoreProvider};
use crate::domain::DomainError;
use crate::infrastructure::http::{HttpClientTrait, HttpMethod};

const PROVIDER: &str = "pinecone";
const DEFAULT_INDEX: &str = "documents";
const UPSERT_BATCH_SIZE: usize = 100;

/// Control plane at the connection URI; data plane at each index host
#[derive(Debug)]
pub struct PineconeVectorStore {
    http: Arc<dyn HttpClientTrait>,
    controller_url: String,
    api_key: String,
    default_index: String,
    hosts: RwLock<HashMap<String, String>>,
}

impl PineconeVectorStore {
    pub fn new(
        http: Arc<dyn HttpClientTrait>,
        controller_url: &str,
        api_key: Option<String>,
    ) -> Result<Self, DomainError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DomainError::validation("Pinecone requires an API key"))?;

        Ok(Self {
            http,
            controller_url: controller_url.trim_end_matches('/').to_string(),
            api_key,
            default_index: DEFAULT_INDEX.to_string(),
            hosts: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = index.into();
        self
    }

    fn index<'a>(&'a self, collection: Option<&'a str>) -> &'a str {
        collection.unwrap_or(&self.default_index)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![("Api-Key", self.api_key.as_str())]
    }

    fn provider_error(err: DomainError) -> DomainError {
        match err {
            DomainError::Provider { message, .. } => DomainError::provider(PROVIDER, message),
            other => other,
        }
    }

    /// Index description, or `None` when the index does not exist
    async fn describe_index(&self, index: &str) -> Result<Option<Value>, DomainError> {
        let url = format!("{}/indexes/{}", self.controller_url, index);
        let response = self
            .http
            .send(HttpMethod::Get, &url, self.headers(), None)
            .await?;

        match response.status {
            404 => Ok(None),
            _ => response.into_json().map(Some).map_err(Self::provider_error),
        }
    }

    async fn host(&self, index: &str) -> Result<String, DomainError> {
        if let Some(host) = self.hosts.read().await.get(index) {
            return Ok(host.clone());
        }

        let description = self
            .describe_index(index)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Pinecone index '{}' not found", index)))?;

        let host = description
            .get("host")
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .map(|h| {
                if h.starts_with("http") {
                    h.trim_end_matches('/').to_string()
                } else {
                    format!("https://{}", h.trim_end_matches('/'))
                }
            })
            .ok_or_else(|| {
                DomainError::provider(PROVIDER, format!("Index '{}' has no host yet", index))
            })?;

        self.hosts
            .write()
            .await
            .insert(index.to_string(), host.clone());
        Ok(host)
    }

    async fn create_index(&self, index: &str, dimension: usize) -> Result<(), DomainError> {
        let body = json!({
            "name": index,
            "dimension": dimension,
            "metric": "cosine",
            "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}},
        });
        let url = format!("{}/indexes", self.controller_url);
        self.http
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(Self::provider_error)?;

        info!(index, dimension, "Created Pinecone index");
        Ok(())
    }

    async fn data_call(&self, index: &str, path: &str, body: &Value) -> Result<Value, DomainError> {
        let url = format!("{}{}", self.host(index).await?, path);
        self.http
            .post_json(&url, self.headers(), body)
            .await
            .map_err(Self::provider_error)
    }

    async fn vector_count(&self, index: &str) -> Result<u64, DomainError> {
        let stats = self
            .data_call(index, "/describe_index_stats", &json!({}))
            .await?;
        Ok(stats
            .get("totalVectorCount")
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    async fn delete_matching(&self, index: &str, key: &str, value: &str) -> Result<u64, DomainError> {
        let before = self.vector_count(index).await?;
        self.data_call(
            index,
            "/vectors/delete",
            &json!({"filter": {key: {"$eq": value}}}),
        )
        .await?;
        let after = self.vector_count(index).await?;
        Ok(before.saturating_sub(after))
    }
}

/// Pinecone metadata holds only flat scalar values, so nested chunk metadata
/// is lifted to the top level where it does not collide.
fn vector_metadata(chunk: &DocumentChunk) -> Metadata {
    let mut record = chunk_record(chunk);
    let nested = match record.remove("metadata") {
        Some(Value::Object(map)) => map,
        _ => Metadata::new(),
    };

    record.retain(|_, v| !v.is_null());
    for (key, value) in nested {
        let flat = matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_));
        if flat && !record.contains_key(&key) {
            record.insert(key, value);
        }
    }
    record
}

#[async_trait]
impl VectorStoreProvider for PineconeVectorStore {
    fn provider_type(&self) -> &'static str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        match self.list_collections().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Pinecone unreachable");
                false
            }
        }
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let url = format!("{}/indexes", self.controller_url);
        let response = self
            .http
            .get_json(&url, self.headers())
            .await
            .map_err(Self::provider_error)?;

        Ok(response
            .get("indexes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        collection: Option<&str>,
    ) -> Vec<VectorSearchResult> {
        let index = self.index(collection);
        let body = json!({
            "vector": query_embedding,
            "topK": top_k,
            "includeMetadata": true,
        });

        let response = match self.data_call(index, "/query", &body).await {
            Ok(response) => response,
            Err(e) => {
                error!(index, error = %e, "Pinecone query failed");
                return Vec::new();
            }
        };

        response
            .get("matches")
            .and_then(Value::as_array)
            .map(|matches| {
                matches
                    .iter()
                    .map(|m| {
                        let mut record = m
                            .get("metadata")
                            .and_then(Value::as_object)
                            .cloned()
                            .unwrap_or_default();
                        if let Some(id) = m.get("id") {
                            record.entry("id").or_insert_with(|| id.clone());
                        }
                        let score = m.get("score").map(coerce_score).unwrap_or(0.0);
                        VectorSearchResult::from_record(&record, score)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn store_chunks(
        &self,
        chunks: &[DocumentChunk],
        collection: Option<&str>,
    ) -> Result<usize, DomainError> {
        let Some(first) = chunks.first() else {
            return Ok(0);
        };
        let index = self.index(collection);

        let vectors = chunks
            .iter()
            .map(|chunk| {
                Ok(json!({
                    "id": chunk.chunk_id,
                    "values": require_embedding(PROVIDER, chunk)?,
                    "metadata": vector_metadata(chunk),
                }))
            })
            .collect::<Result<Vec<Value>, DomainError>>()?;

        if self.describe_index(index).await?.is_none() {
            let dimension = require_embedding(PROVIDER, first)?.len();
            self.create_index(index, dimension).await?;
        }

        let mut stored = 0;
        for batch in vectors.chunks(UPSERT_BATCH_SIZE) {
            let response = self
                .data_call(index, "/vectors/upsert", &json!({"vectors": batch}))
                .await?;
            stored += response
                .get("upsertedCount")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(batch.len());
        }

        Ok(stored)
    }

    async fn delete_by_raw_document_id(
        &self,
        raw_document_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        self.delete_matching(self.index(collection), "raw_document_id", raw_document_id)
            .await
    }

    async fn delete_by_origin_id(
        &self,
        origin_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        self.delete_matching(self.index(collection), "origin_id", origin_id)
            .await
    }

    async fn count_chunks(&self, collection: Option<&str>) -> Result<u64, DomainError> {
        self.vector_count(self.index(collection)).await
    }

    async fn diagnose(
        &self,
        query_embedding: &[f32],
        collection: Option<&str>,
    ) -> RetrievalDiagnosis {
        let index = self.index(collection).to_string();

        let description = match self.describe_index(&index).await {
            Ok(Some(d)) => d,
            Ok(None) => return RetrievalDiagnosis::EmptyCollection { collection: index },
            Err(e) => {
                return RetrievalDiagnosis::SearchError {
                    message: e.to_string(),
                }
            }
        };

        match self.vector_count(&index).await {
            Ok(0) => return RetrievalDiagnosis::EmptyCollection { collection: index },
            Ok(_) => {}
            Err(e) => {
                return RetrievalDiagnosis::SearchError {
                    message: e.to_string(),
                }
            }
        }

        match description.get("dimension").and_then(Value::as_u64) {
            Some(stored) if stored as usize != query_embedding.len() => {
                RetrievalDiagnosis::DimensionMismatch {
                    collection: index,
                    stored: stored as usize,
                    query: query_embedding.len(),
                }
            }
            _ => RetrievalDiagnosis::NoRelevantContent,
        }
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::mock::MockHttpClient;
    use crate::infrastructure::vector_store::fixtures::chunk;

    const CONTROLLER: &str = "https://api.pinecone.io";

    fn with_index(http: MockHttpClient) -> MockHttpClient {
        http.with_response(
            "https://api.pinecone.io/indexes/documents",
            json!({"name": "documents", "host": "documents-abc.svc.pinecone.io", "dimension": 3}),
        )
    }

    #[test]
    fn test_api_key_required() {
        let http = Arc::new(MockHttpClient::new());
        assert!(PineconeVectorStore::new(http.clone(), CONTROLLER, None).is_err());
        assert!(PineconeVectorStore::new(http, CONTROLLER, Some(" ".to_string())).is_err());
    }

    #[tokio::test]
    async fn test_query_resolves_host_and_normalizes() {
        let http = Arc::new(with_index(MockHttpClient::new()).with_response(
            "https://documents-abc.svc.pinecone.io/query",
            json!({"matches": [
                {"id": "raw_chunk_0", "score": 0.8, "metadata": {"content": "hello", "line_start": 1.0}},
                {"id": "raw_chunk_1", "score": "0.5", "metadata": {"content": "world"}}
            ]}),
        ));
        let store = PineconeVectorStore::new(http.clone(), CONTROLLER, Some("pk".into())).unwrap();

        let results = store.vector_search(&[0.1, 0.2, 0.3], 2, None).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, "raw_chunk_0");
        assert_eq!(results[0].line_start, 1);
        assert_eq!(results[1].score, 0.5);
        assert_eq!(results[1].file_name, "Unknown");

        store.vector_search(&[0.1, 0.2, 0.3], 2, None).await;
        assert_eq!(http.requests_to("https://api.pinecone.io/indexes/documents").len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_in_batches() {
        let http = Arc::new(with_index(MockHttpClient::new()).with_response(
            "https://documents-abc.svc.pinecone.io/vectors/upsert",
            json!({}),
        ));
        let store = PineconeVectorStore::new(http.clone(), CONTROLLER, Some("pk".into())).unwrap();

        let chunks: Vec<DocumentChunk> = (0..250)
            .map(|i| chunk(&format!("c{}", i), "text", vec![0.1, 0.2, 0.3]))
            .collect();
        assert_eq!(store.store_chunks(&chunks, None).await.unwrap(), 250);

        let upserts = http.requests_to("https://documents-abc.svc.pinecone.io/vectors/upsert");
        let sizes: Vec<usize> = upserts
            .iter()
            .map(|r| r.body.as_ref().unwrap()["vectors"].as_array().unwrap().len())
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_vector_metadata_is_flat() {
        let mut c = chunk("c1", "text", vec![1.0]);
        c.metadata.insert("origin_collection".into(), json!("movies"));
        c.metadata.insert("nested".into(), json!({"a": 1}));

        let metadata = vector_metadata(&c);
        assert_eq!(metadata["origin_collection"], "movies");
        assert!(!metadata.contains_key("nested"));
        assert!(!metadata.contains_key("metadata"));
        assert!(metadata.values().all(|v| !v.is_object()));
    }

    #[tokio::test]
    async fn test_query_failure_is_empty() {
        let http = Arc::new(MockHttpClient::new().with_status(
            "https://api.pinecone.io/indexes/documents",
            404,
            json!("missing"),
        ));
        let store = PineconeVectorStore::new(http, CONTROLLER, Some("pk".into())).unwrap();
        assert!(store.vector_search(&[0.1], 3, None).await.is_empty());
    }
}

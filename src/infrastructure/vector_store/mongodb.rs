//! MongoDB Atlas vector search provider

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection, SearchIndexModel, SearchIndexType};
use tracing::{debug, error, info, warn};

use super::{chunk_record, require_embedding};
use crate::domain::collection::{is_raw_document_collection, CollectionNamespace};
use crate::domain::document::DocumentChunk;
use crate::domain::retrieval::RetrievalDiagnosis;
use crate::domain::vector_store::{coerce_score, VectorSearchResult, VectorStoreProvider};
use crate::domain::DomainError;
use crate::infrastructure::mongo::{
    connect, document_to_map, embedding_to_bson, map_to_document, ping, storage_error,
    MongoTimeouts,
};

const PROVIDER: &str = "mongo";

/// Conventional index names tried after the configured one
pub const INDEX_CANDIDATES: [&str; 3] = ["vector_index", "default", "vector_data_index"];

const MIN_CANDIDATES: usize = 100;
const CANDIDATE_FACTOR: usize = 10;

/// `$vectorSearch` over an embedding field named `embedding`
#[derive(Debug, Clone)]
pub struct MongoVectorStore {
    client: Client,
    database: String,
    default_collection: String,
    index_name: String,
}

impl MongoVectorStore {
    pub fn new(
        client: Client,
        database: impl Into<String>,
        default_collection: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            database: database.into(),
            default_collection: default_collection.into(),
            index_name: index_name.into(),
        }
    }

    pub async fn connect(
        uri: &str,
        database: &str,
        default_collection: &str,
        index_name: &str,
        timeouts: MongoTimeouts,
    ) -> Result<Self, DomainError> {
        let client = connect(uri, "pmp-rag-vector", timeouts).await?;
        Ok(Self::new(client, database, default_collection, index_name))
    }

    /// `db.coll` addresses another database; a bare name uses the default one
    fn namespace(&self, collection: Option<&str>) -> CollectionNamespace {
        CollectionNamespace::parse(
            collection.unwrap_or(&self.default_collection),
            &self.database,
        )
    }

    fn collection(&self, namespace: &CollectionNamespace) -> Collection<Document> {
        self.client
            .database(&namespace.database)
            .collection(&namespace.collection)
    }

    /// Configured index first, then the conventional names, without repeats
    fn index_candidates(&self) -> Vec<&str> {
        let mut candidates = vec![self.index_name.as_str()];
        for name in INDEX_CANDIDATES {
            if !candidates.contains(&name) {
                candidates.push(name);
            }
        }
        candidates
    }

    fn search_pipeline(index: &str, query_embedding: &[f32], top_k: usize) -> Vec<Document> {
        let num_candidates = (top_k * CANDIDATE_FACTOR).max(MIN_CANDIDATES);

        vec![
            doc! {
                "$vectorSearch": {
                    "index": index,
                    "path": "embedding",
                    "queryVector": embedding_to_bson(query_embedding),
                    "numCandidates": num_candidates as i64,
                    "limit": top_k as i64,
                }
            },
            doc! {"$set": {"score": {"$meta": "vectorSearchScore"}}},
            doc! {"$project": {"embedding": 0}},
        ]
    }

    async fn search_with_index(
        &self,
        collection: &Collection<Document>,
        index: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorSearchResult>, DomainError> {
        let documents: Vec<Document> = collection
            .aggregate(Self::search_pipeline(index, query_embedding, top_k))
            .await
            .map_err(|e| storage_error("Vector search failed", e))?
            .try_collect()
            .await
            .map_err(|e| storage_error("Failed to read vector search results", e))?;

        Ok(documents
            .iter()
            .map(|document| {
                let record = document_to_map(document);
                let score = record.get("score").map(coerce_score).unwrap_or(0.0);
                VectorSearchResult::from_record(&record, score)
            })
            .collect())
    }

    async fn has_search_index(&self, collection: &Collection<Document>) -> Option<bool> {
        let indexes: Vec<Document> = collection
            .list_search_indexes()
            .await
            .ok()?
            .try_collect()
            .await
            .ok()?;

        let candidates = self.index_candidates();
        Some(
            indexes
                .iter()
                .filter_map(|index| index.get_str("name").ok())
                .any(|name| candidates.contains(&name)),
        )
    }

    async fn collection_exists(&self, namespace: &CollectionNamespace) -> Result<bool, DomainError> {
        let names = self
            .client
            .database(&namespace.database)
            .list_collection_names()
            .filter(doc! {"name": &namespace.collection})
            .await
            .map_err(|e| storage_error("Failed to list collections", e))?;
        Ok(!names.is_empty())
    }

    /// Create the collection and register an Atlas vector index sized to
    /// `dimension`. Index creation only works on Atlas, so failure is logged.
    async fn create_vector_collection(
        &self,
        namespace: &CollectionNamespace,
        dimension: usize,
    ) -> Result<(), DomainError> {
        self.client
            .database(&namespace.database)
            .create_collection(&namespace.collection)
            .await
            .map_err(|e| storage_error("Failed to create collection", e))?;

        let model = SearchIndexModel::builder()
            .definition(doc! {
                "fields": [{
                    "type": "vector",
                    "path": "embedding",
                    "numDimensions": dimension as i64,
                    "similarity": "cosine",
                }]
            })
            .name(self.index_name.clone())
            .index_type(SearchIndexType::VectorSearch)
            .build();

        match self.collection(namespace).create_search_index(model).await {
            Ok(name) => info!(namespace = %namespace, index = %name, dimension, "Created vector search index"),
            Err(e) => warn!(
                namespace = %namespace,
                index = %self.index_name,
                error = %e,
                "Could not create vector search index; create it in Atlas before querying"
            ),
        }

        Ok(())
    }

    /// Chunks a batch supersedes: the same chunk ids, or any chunk of the
    /// same raw documents, so a reprocess with fewer chunks leaves no tail
    fn superseded_chunks_filter(chunks: &[DocumentChunk]) -> Document {
        let chunk_ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        let mut raw_ids: Vec<&str> = chunks
            .iter()
            .filter_map(|c| c.raw_document_id.as_deref())
            .collect();
        raw_ids.sort_unstable();
        raw_ids.dedup();

        if raw_ids.is_empty() {
            return doc! {"chunk_id": {"$in": chunk_ids}};
        }
        doc! {
            "$or": [
                {"chunk_id": {"$in": chunk_ids}},
                {"raw_document_id": {"$in": raw_ids}},
            ]
        }
    }

    fn chunk_document(chunk: &DocumentChunk) -> Result<Document, DomainError> {
        let embedding = require_embedding(PROVIDER, chunk)?;
        let mut document = map_to_document(&chunk_record(chunk))?;
        document.insert("embedding", embedding_to_bson(embedding));
        Ok(document)
    }
}

#[async_trait]
impl VectorStoreProvider for MongoVectorStore {
    fn provider_type(&self) -> &'static str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        ping(&self.client).await
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let mut names = self
            .client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(|e| storage_error("Failed to list collections", e))?;
        names.sort();
        Ok(names)
    }

    /// Tries each candidate index in order and keeps the first non-empty
    /// result. When every candidate comes back empty the reason is logged.
    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        collection: Option<&str>,
    ) -> Vec<VectorSearchResult> {
        let namespace = self.namespace(collection);
        if is_raw_document_collection(&namespace.collection) {
            warn!(namespace = %namespace, "Refusing vector search on a raw document collection");
            return Vec::new();
        }

        let target = self.collection(&namespace);
        for index in self.index_candidates() {
            match self
                .search_with_index(&target, index, query_embedding, top_k)
                .await
            {
                Ok(results) if !results.is_empty() => {
                    debug!(namespace = %namespace, index, count = results.len(), "Vector search hit");
                    return results;
                }
                Ok(_) => debug!(namespace = %namespace, index, "No results from index"),
                Err(e) => warn!(namespace = %namespace, index, error = %e, "Vector search failed for index"),
            }
        }

        let diagnosis = self.diagnose(query_embedding, collection).await;
        if diagnosis.is_healthy() {
            debug!(namespace = %namespace, "No relevant content");
        } else {
            error!(namespace = %namespace, diagnosis = %diagnosis, "Vector search returned nothing");
        }

        Vec::new()
    }

    async fn store_chunks(
        &self,
        chunks: &[DocumentChunk],
        collection: Option<&str>,
    ) -> Result<usize, DomainError> {
        let Some(first) = chunks.first() else {
            return Ok(0);
        };

        let documents = chunks
            .iter()
            .map(Self::chunk_document)
            .collect::<Result<Vec<_>, _>>()?;

        let namespace = self.namespace(collection);
        if !self.collection_exists(&namespace).await? {
            let dimension = require_embedding(PROVIDER, first)?.len();
            self.create_vector_collection(&namespace, dimension).await?;
        }

        let collection = self.collection(&namespace);
        let replaced = collection
            .delete_many(Self::superseded_chunks_filter(chunks))
            .await
            .map_err(|e| storage_error("Failed to replace chunks", e))?;
        if replaced.deleted_count > 0 {
            debug!(namespace = %namespace, replaced = replaced.deleted_count, "Removed previous chunks");
        }

        let result = collection
            .insert_many(documents)
            .await
            .map_err(|e| storage_error("Failed to store chunks", e))?;

        info!(namespace = %namespace, stored = result.inserted_ids.len(), "Stored chunks");
        Ok(result.inserted_ids.len())
    }

    async fn delete_by_raw_document_id(
        &self,
        raw_document_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        let namespace = self.namespace(collection);
        let result = self
            .collection(&namespace)
            .delete_many(doc! {"raw_document_id": raw_document_id})
            .await
            .map_err(|e| storage_error("Failed to delete chunks", e))?;
        Ok(result.deleted_count)
    }

    async fn delete_by_origin_id(
        &self,
        origin_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        let namespace = self.namespace(collection);
        let result = self
            .collection(&namespace)
            .delete_many(doc! {"origin_id": origin_id})
            .await
            .map_err(|e| storage_error("Failed to delete chunks", e))?;
        Ok(result.deleted_count)
    }

    async fn count_chunks(&self, collection: Option<&str>) -> Result<u64, DomainError> {
        self.collection(&self.namespace(collection))
            .count_documents(doc! {})
            .await
            .map_err(|e| storage_error("Failed to count chunks", e))
    }

    async fn diagnose(
        &self,
        query_embedding: &[f32],
        collection: Option<&str>,
    ) -> RetrievalDiagnosis {
        let namespace = self.namespace(collection);
        let name = namespace.collection.clone();

        if is_raw_document_collection(&name) {
            return RetrievalDiagnosis::RawDocumentCollection { collection: name };
        }

        let target = self.collection(&namespace);
        let total = match target.count_documents(doc! {}).await {
            Ok(n) => n,
            Err(e) => {
                return RetrievalDiagnosis::SearchError {
                    message: e.to_string(),
                }
            }
        };
        if total == 0 {
            return RetrievalDiagnosis::EmptyCollection { collection: name };
        }

        let sample = target
            .find_one(doc! {"embedding": {"$exists": true, "$type": "array"}})
            .projection(doc! {"embedding": 1})
            .await;
        let stored_dimension = match sample {
            Ok(Some(document)) => match document.get("embedding") {
                Some(Bson::Array(values)) => values.len(),
                _ => 0,
            },
            Ok(None) => {
                return RetrievalDiagnosis::NoEmbeddings {
                    collection: name,
                    documents: total,
                }
            }
            Err(e) => {
                return RetrievalDiagnosis::SearchError {
                    message: e.to_string(),
                }
            }
        };

        if stored_dimension != query_embedding.len() {
            return RetrievalDiagnosis::DimensionMismatch {
                collection: name,
                stored: stored_dimension,
                query: query_embedding.len(),
            };
        }

        if self.has_search_index(&target).await == Some(false) {
            return RetrievalDiagnosis::MissingVectorIndex {
                database: namespace.database,
                collection: name,
                index_name: self.index_name.clone(),
            };
        }

        RetrievalDiagnosis::NoRelevantContent
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

//! Vector store provider trait

use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::VectorSearchResult;
use crate::domain::connection::Connection;
use crate::domain::document::DocumentChunk;
use crate::domain::retrieval::RetrievalDiagnosis;
use crate::domain::DomainError;

/// Backend a connection points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Mongo,
    Redis,
    Qdrant,
    Pinecone,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [Self::Mongo, Self::Redis, Self::Qdrant, Self::Pinecone];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mongo => "mongo",
            Self::Redis => "redis",
            Self::Qdrant => "qdrant",
            Self::Pinecone => "pinecone",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "Invalid provider '{}'. Must be one of: mongo, redis, qdrant, pinecone",
                    s
                ))
            })
    }
}

/// Uniform search/store contract over a vector backend.
///
/// `vector_search` never fails: connection problems, missing collections and
/// backend errors are logged and reported as an empty result so one bad
/// source cannot abort a multi-provider fan-out. Writes do surface errors.
#[async_trait]
pub trait VectorStoreProvider: Send + Sync + Debug {
    /// Short provider name used to tag results
    fn provider_type(&self) -> &'static str;

    async fn test_connection(&self) -> bool;

    async fn list_collections(&self) -> Result<Vec<String>, DomainError>;

    /// Up to `top_k` normalized results ordered by descending score
    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        collection: Option<&str>,
    ) -> Vec<VectorSearchResult>;

    /// Store embedded chunks, creating the collection or index on first use
    async fn store_chunks(
        &self,
        chunks: &[DocumentChunk],
        collection: Option<&str>,
    ) -> Result<usize, DomainError>;

    async fn delete_by_raw_document_id(
        &self,
        raw_document_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        let _ = (raw_document_id, collection);
        Err(DomainError::provider(
            self.provider_type(),
            "delete_by_raw_document_id is not supported",
        ))
    }

    async fn delete_by_origin_id(
        &self,
        origin_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        let _ = (origin_id, collection);
        Err(DomainError::provider(
            self.provider_type(),
            "delete_by_origin_id is not supported",
        ))
    }

    async fn count_chunks(&self, collection: Option<&str>) -> Result<u64, DomainError> {
        let _ = collection;
        Err(DomainError::provider(
            self.provider_type(),
            "count_chunks is not supported",
        ))
    }

    /// Explain an empty search result. Providers that cannot inspect their
    /// backend report `NoRelevantContent`.
    async fn diagnose(
        &self,
        query_embedding: &[f32],
        collection: Option<&str>,
    ) -> RetrievalDiagnosis {
        let _ = (query_embedding, collection);
        RetrievalDiagnosis::NoRelevantContent
    }

    /// Release client handles; safe to call more than once
    async fn close(&self);
}

/// Builds a provider for a registered connection.
#[async_trait]
pub trait VectorStoreFactory: Send + Sync + Debug {
    async fn create(
        &self,
        connection: &Connection,
    ) -> Result<Arc<dyn VectorStoreProvider>, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::RwLock;

    /// Mock vector store keeping stored chunks per collection
    #[derive(Debug)]
    pub struct MockVectorStoreProvider {
        provider: &'static str,
        stored: RwLock<HashMap<String, Vec<DocumentChunk>>>,
        search_results: RwLock<HashMap<String, Vec<VectorSearchResult>>>,
        searches: RwLock<Vec<Option<String>>>,
        close_count: AtomicUsize,
        should_fail: AtomicBool,
    }

    const DEFAULT_KEY: &str = "";

    impl MockVectorStoreProvider {
        pub fn new(provider: &'static str) -> Self {
            Self {
                provider,
                stored: RwLock::new(HashMap::new()),
                search_results: RwLock::new(HashMap::new()),
                searches: RwLock::new(Vec::new()),
                close_count: AtomicUsize::new(0),
                should_fail: AtomicBool::new(false),
            }
        }

        /// Results returned for searches on `collection` (`None` is the default)
        pub fn with_results(
            self,
            collection: Option<&str>,
            results: Vec<VectorSearchResult>,
        ) -> Self {
            self.search_results
                .write()
                .unwrap()
                .insert(collection.unwrap_or(DEFAULT_KEY).to_string(), results);
            self
        }

        pub fn set_should_fail(&self, fail: bool) {
            self.should_fail.store(fail, Ordering::SeqCst);
        }

        pub fn stored_chunks(&self, collection: Option<&str>) -> Vec<DocumentChunk> {
            self.stored
                .read()
                .unwrap()
                .get(collection.unwrap_or(DEFAULT_KEY))
                .cloned()
                .unwrap_or_default()
        }

        pub fn searched_collections(&self) -> Vec<Option<String>> {
            self.searches.read().unwrap().clone()
        }

        pub fn close_count(&self) -> usize {
            self.close_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VectorStoreProvider for MockVectorStoreProvider {
        fn provider_type(&self) -> &'static str {
            self.provider
        }

        async fn test_connection(&self) -> bool {
            !self.should_fail.load(Ordering::SeqCst)
        }

        async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
            let mut names: Vec<String> = self
                .stored
                .read()
                .unwrap()
                .keys()
                .filter(|k| !k.is_empty())
                .cloned()
                .collect();
            names.sort();
            Ok(names)
        }

        async fn vector_search(
            &self,
            _query_embedding: &[f32],
            top_k: usize,
            collection: Option<&str>,
        ) -> Vec<VectorSearchResult> {
            self.searches
                .write()
                .unwrap()
                .push(collection.map(str::to_string));

            if self.should_fail.load(Ordering::SeqCst) {
                return Vec::new();
            }

            self.search_results
                .read()
                .unwrap()
                .get(collection.unwrap_or(DEFAULT_KEY))
                .map(|r| r.iter().take(top_k).cloned().collect())
                .unwrap_or_default()
        }

        async fn store_chunks(
            &self,
            chunks: &[DocumentChunk],
            collection: Option<&str>,
        ) -> Result<usize, DomainError> {
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(DomainError::provider(
                    self.provider,
                    "Mock provider configured to fail",
                ));
            }

            self.stored
                .write()
                .unwrap()
                .entry(collection.unwrap_or(DEFAULT_KEY).to_string())
                .or_default()
                .extend(chunks.iter().cloned());
            Ok(chunks.len())
        }

        async fn close(&self) {
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Factory resolving connection ids to pre-built mock providers
    #[derive(Debug, Default)]
    pub struct MockVectorStoreFactory {
        providers: RwLock<HashMap<String, Arc<MockVectorStoreProvider>>>,
    }

    impl MockVectorStoreFactory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_provider(
            self,
            connection_id: impl Into<String>,
            provider: Arc<MockVectorStoreProvider>,
        ) -> Self {
            self.providers
                .write()
                .unwrap()
                .insert(connection_id.into(), provider);
            self
        }
    }

    #[async_trait]
    impl VectorStoreFactory for MockVectorStoreFactory {
        async fn create(
            &self,
            connection: &Connection,
        ) -> Result<Arc<dyn VectorStoreProvider>, DomainError> {
            self.providers
                .read()
                .unwrap()
                .get(&connection.connection_id)
                .cloned()
                .map(|p| p as Arc<dyn VectorStoreProvider>)
                .ok_or_else(|| {
                    DomainError::provider(
                        connection.provider.as_str(),
                        format!("cannot connect to {}", connection.connection_id),
                    )
                })
        }
    }
}

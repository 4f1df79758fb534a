//! Semantic chunk repository trait

use async_trait::async_trait;

use crate::domain::collection::CollectionNamespace;
use crate::domain::document::SemanticChunk;
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Persistence for chunks written straight from origin documents.
///
/// Records are keyed by `SemanticChunk::key`, so re-ingesting a document
/// overwrites its chunks in place.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SemanticChunkRepository: Send + Sync {
    async fn upsert_chunks(
        &self,
        namespace: &CollectionNamespace,
        chunks: Vec<SemanticChunk>,
    ) -> Result<usize, DomainError>;

    async fn has_origin(
        &self,
        namespace: &CollectionNamespace,
        origin_id: &str,
    ) -> Result<bool, DomainError>;

    async fn delete_by_origin(
        &self,
        namespace: &CollectionNamespace,
        origin_id: &str,
    ) -> Result<u64, DomainError>;

    async fn count(&self, namespace: &CollectionNamespace) -> Result<u64, DomainError>;
}

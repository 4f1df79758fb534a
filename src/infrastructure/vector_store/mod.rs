//! Vector store providers

mod factory;
#[cfg(test)]
mod in_memory;
mod mongodb;
mod pinecone;
mod qdrant;
mod redis;

pub use factory::{DefaultVectorStoreFactory, MongoVectorDefaults};
#[cfg(test)]
pub use in_memory::InMemoryVectorStore;
pub use mongodb::{MongoVectorStore, INDEX_CANDIDATES};
pub use pinecone::PineconeVectorStore;
pub use qdrant::QdrantVectorStore;
pub use redis::RedisVectorStore;

use serde_json::{json, Value};

use crate::domain::document::{DocumentChunk, Metadata};
use crate::domain::DomainError;

/// Chunk fields persisted next to the vector, without the embedding
pub(crate) fn chunk_record(chunk: &DocumentChunk) -> Metadata {
    let value = json!({
        "chunk_id": chunk.chunk_id,
        "document_id": chunk.document_id,
        "file_name": chunk.file_name,
        "chunk_index": chunk.chunk_index,
        "content": chunk.content,
        "line_start": chunk.line_start,
        "line_end": chunk.line_end,
        "metadata": chunk.metadata,
        "origin_id": chunk.origin_id,
        "raw_document_id": chunk.raw_document_id,
    });

    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// Embedding of a chunk, which must be present before storing
pub(crate) fn require_embedding<'a>(
    provider: &str,
    chunk: &'a DocumentChunk,
) -> Result<&'a [f32], DomainError> {
    chunk
        .embedding
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            DomainError::provider(
                provider,
                format!("Chunk {} has no embedding", chunk.chunk_id),
            )
        })
}

/// Cosine similarity; zero-length or zero-norm vectors score 0
#[cfg(test)]
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_chunk_record_omits_embedding() {
        let record = chunk_record(&fixtures::chunk("c1", "hello", vec![0.1, 0.2]));
        assert_eq!(record["chunk_id"], "c1");
        assert_eq!(record["line_end"], 3);
        assert!(!record.contains_key("embedding"));
    }

    #[test]
    fn test_require_embedding() {
        let mut chunk = fixtures::chunk("c1", "hello", vec![]);
        assert!(require_embedding("mongo", &chunk).is_err());
        chunk.embedding = Some(vec![1.0]);
        assert_eq!(require_embedding("mongo", &chunk).unwrap(), &[1.0]);
    }
}

//! Domain layer - Core entities, traits and errors

pub mod chunking;
pub mod collection;
pub mod connection;
pub mod document;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod language_model;
pub mod origin;
pub mod retrieval;
pub mod store;
pub mod vector_store;

pub use chunking::{ChunkingConfig, TextChunk, TextChunker};
pub use collection::{
    ensure_origin_collection, get_origin_collection_name, get_semantic_collection_name,
    is_raw_document_collection, is_semantic_collection, CollectionNamespace,
};
pub use connection::{
    Connection, ConnectionRepository, ConnectionScope, ConnectionStatus, ConnectionSummary,
    SecretCipher, StoredConnection,
};
pub use document::{
    DocumentChunk, Metadata, OriginDocument, OriginDocumentPreview, RawDocument,
    RawDocumentFilter, RawDocumentStatus, SemanticChunk, StatusCounts, UpsertOutcome,
};
pub use embedding::Embedder;
pub use error::DomainError;
pub use ingestion::{
    BatchIngestionResult, BatchItemDetail, IngestOutcome, ItemStatus, ProcessResult,
    SemanticIngestOutcome, TextExtractor,
};
pub use language_model::LanguageModel;
pub use origin::{OriginConnectionConfig, OriginSource, OriginSourceFactory, OriginSourceType};
pub use retrieval::{QueryRequest, QueryResponse, RetrievalDiagnosis, SourceReference};
pub use store::{RawDocumentRepository, SemanticChunkRepository};
pub use vector_store::{ProviderType, VectorSearchResult, VectorStoreFactory, VectorStoreProvider};

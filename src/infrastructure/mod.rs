//! Infrastructure layer - External service implementations

pub mod chunking;
pub mod connection;
pub mod embedding;
pub mod http;
pub mod ingestion;
pub mod llm;
pub mod logging;
pub mod mongo;
pub mod origin;
pub mod qdrant;
pub mod rag;
pub mod realtime;
pub mod retrieval;
pub mod store;
pub mod vector_store;

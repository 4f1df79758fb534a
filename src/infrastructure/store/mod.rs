//! Raw document and semantic chunk stores

#[cfg(test)]
mod in_memory;
mod mongodb;

#[cfg(test)]
pub use in_memory::{InMemoryRawDocumentRepository, InMemorySemanticChunkRepository};
pub use mongodb::{MongoRawDocumentRepository, MongoSemanticChunkRepository};

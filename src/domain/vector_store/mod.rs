//! Vector store providers and their canonical result shape

mod provider;
mod result;

pub use provider::{ProviderType, VectorStoreFactory, VectorStoreProvider};
pub use result::{coerce_line, coerce_score, VectorSearchResult, UNKNOWN_FILE_NAME};

#[cfg(test)]
pub use provider::mock;

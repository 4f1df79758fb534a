//! Origin source implementations

pub mod extractor;
mod factory;
mod filesystem;
mod mongodb;
mod qdrant;

pub use extractor::extract_text_content;
pub use factory::DefaultOriginSourceFactory;
pub use filesystem::FilesystemOriginSource;
pub use mongodb::{normalize_document, MongoOriginSource};
pub use qdrant::QdrantOriginSource;

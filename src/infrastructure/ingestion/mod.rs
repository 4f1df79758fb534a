//! Document ingestion: pipeline, file uploads and text extraction

mod extractor;
pub mod pipeline;
mod upload;

pub use extractor::PlainTextExtractor;
pub use pipeline::{IngestionPipeline, IngestionPipelineDeps};
pub use upload::{FileUploadIngestor, UploadOutcome, UploadPolicy};

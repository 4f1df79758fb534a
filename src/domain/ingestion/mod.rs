//! Ingestion outcome types shared by the pipeline and its callers

mod extractor;
mod result;

pub use extractor::TextExtractor;
pub use result::{
    BatchIngestionResult, BatchItemDetail, IngestOutcome, ItemStatus, ProcessResult,
    SemanticIngestOutcome, REASON_DUPLICATE_ORIGIN,
};

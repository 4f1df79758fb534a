//! Document models for every stage of the pipeline
//!
//! Origin documents are fetched from an external system, persisted verbatim
//! as raw documents, then chunked and embedded into document chunks (raw
//! path) or semantic chunks (direct path).

mod chunk;
mod origin;
mod raw;

pub use chunk::{DocumentChunk, SemanticChunk};
pub use origin::{OriginDocument, OriginDocumentPreview};
pub use raw::{RawDocument, RawDocumentFilter, RawDocumentStatus, StatusCounts, UpsertOutcome};

/// Free-form metadata attached to documents and chunks.
///
/// Insertion order is preserved so extracted content and serialized
/// metadata keep the field order of the source record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

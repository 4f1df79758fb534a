//! Document and chunk persistence

mod raw;
mod semantic;

pub use raw::{RawDocumentRepository, DEFAULT_LIST_LIMIT};
pub use semantic::SemanticChunkRepository;

#[cfg(test)]
pub use raw::MockRawDocumentRepository;
#[cfg(test)]
pub use semantic::MockSemanticChunkRepository;

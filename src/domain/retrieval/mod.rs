//! Query-time types: requests, answers and zero-result diagnoses

mod diagnostics;
mod query;

pub use diagnostics::RetrievalDiagnosis;
pub use query::{QueryRequest, QueryResponse, SourceReference, DEFAULT_TOP_K};

//! Query-time retrieval across connections

mod diagnostics;
mod unified;

pub use diagnostics::CollectionDiagnostics;
pub use unified::{merge_results, plan_targets, SearchTarget, UnifiedRetrieval};

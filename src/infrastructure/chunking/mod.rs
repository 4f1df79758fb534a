//! Text chunking implementations

mod content;
mod recursive;

pub use content::prepare_for_chunking;
pub use recursive::{RecursiveChunker, DEFAULT_SEPARATORS};

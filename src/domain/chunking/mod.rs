//! Text chunking

mod chunker;

pub use chunker::{ChunkingConfig, TextChunk, TextChunker};

//! Text embedding

mod embedder;

pub use embedder::Embedder;

#[cfg(test)]
pub use embedder::mock;

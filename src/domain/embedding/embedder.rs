//! Embedder trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Converts text into fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync + Debug {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// One vector per input, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    pub struct MockEmbedder {
        dimension: usize,
        error: Option<String>,
        drop_last: bool,
        calls: AtomicUsize,
    }

    impl MockEmbedder {
        pub fn new(dimension: usize) -> Self {
            Self {
                dimension,
                error: None,
                drop_last: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        /// Return one embedding fewer than requested from `embed_batch`
        pub fn dropping_last(mut self) -> Self {
            self.drop_last = true;
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_add(b as u64));
            (0..self.dimension)
                .map(|i| ((hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0) - 0.5)
                .collect()
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref error) = self.error {
                return Err(DomainError::embedding(error));
            }
            Ok(self.vector_for(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref error) = self.error {
                return Err(DomainError::embedding(error));
            }

            let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
            if self.drop_last {
                vectors.pop();
            }
            Ok(vectors)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "mock-embedder"
        }
    }
}

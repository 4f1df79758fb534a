//! TTL cache in front of an embedder for repeated query texts

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::domain::embedding::Embedder;
use crate::domain::DomainError;

const DEFAULT_CAPACITY: u64 = 1_000;

/// Caches single-text embeddings; batch calls go straight to the inner embedder
#[derive(Debug)]
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: Arc<dyn Embedder>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(capacity)
            .build();

        Self { inner, cache }
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if let Some(cached) = self.cache.get(text).await {
            tracing::debug!(model = self.inner.model_name(), "Embedding cache hit");
            return Ok((*cached).clone());
        }

        let vector = self.inner.embed(text).await?;
        self.cache
            .insert(text.to_string(), Arc::new(vector.clone()))
            .await;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        self.inner.embed_batch(texts).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::mock::MockEmbedder;

    #[tokio::test]
    async fn test_repeated_text_hits_cache() {
        let inner = Arc::new(MockEmbedder::new(4));
        let cached = CachedEmbedder::new(inner.clone(), Duration::from_secs(60));

        let first = cached.embed("what is rust?").await.unwrap();
        let second = cached.embed("what is rust?").await.unwrap();
        cached.embed("something else").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let inner = Arc::new(MockEmbedder::new(4).with_error("down"));
        let cached = CachedEmbedder::new(inner.clone(), Duration::from_secs(60));

        assert!(cached.embed("q").await.is_err());
        assert!(cached.embed("q").await.is_err());
        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_batch_bypasses_cache() {
        let inner = Arc::new(MockEmbedder::new(2));
        let cached = CachedEmbedder::new(inner.clone(), Duration::from_secs(60));

        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(cached.embed_batch(&texts).await.unwrap().len(), 2);
        assert_eq!(cached.dimension(), 2);
    }
}

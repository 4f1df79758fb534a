//! OpenAI-compatible embeddings endpoint

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::embedding::Embedder;
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;

/// Calls `POST {base_url}/v1/embeddings` and checks every vector has the
/// configured dimension.
#[derive(Debug)]
pub struct HttpEmbedder {
    client: Arc<dyn HttpClientTrait>,
    url: String,
    auth_header: Option<String>,
    model: String,
    dimension: usize,
}

impl HttpEmbedder {
    pub fn new(
        client: Arc<dyn HttpClientTrait>,
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let url = if base_url.ends_with("/embeddings") {
            base_url.to_string()
        } else {
            format!("{}/v1/embeddings", base_url)
        };

        Self {
            client,
            url,
            auth_header: api_key
                .filter(|k| !k.is_empty())
                .map(|k| format!("Bearer {}", k)),
            model: model.into(),
            dimension,
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        match self.auth_header {
            Some(ref header) => vec![("Authorization", header.as_str())],
            None => vec![],
        }
    }

    fn validate(&self, vectors: &[Vec<f32>], expected: usize) -> Result<(), DomainError> {
        if vectors.len() != expected {
            return Err(DomainError::embedding(format!(
                "Embedding count mismatch: requested {}, received {}",
                expected,
                vectors.len()
            )));
        }

        if let Some((index, vector)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != self.dimension)
        {
            return Err(DomainError::embedding(format!(
                "Embedding {} has dimension {}, expected {}",
                index,
                vector.len(),
                self.dimension
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::embedding("Embedding service returned no vector"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({"model": self.model, "input": texts});
        let response = self
            .client
            .post_json(&self.url, self.headers(), &body)
            .await
            .map_err(|e| DomainError::embedding(format!("Embedding request failed: {}", e)))?;

        let mut parsed: EmbeddingsResponse = serde_json::from_value(response).map_err(|e| {
            DomainError::embedding(format!("Failed to parse embedding response: {}", e))
        })?;
        parsed.data.sort_by_key(|d| d.index);

        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        self.validate(&vectors, texts.len())?;

        tracing::debug!(model = %self.model, count = vectors.len(), "Generated embeddings");
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

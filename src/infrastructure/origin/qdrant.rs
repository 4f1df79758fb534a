//! Qdrant collection as an origin source

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::collection::ensure_origin_collection;
use crate::domain::document::{Metadata, OriginDocument, OriginDocumentPreview};
use crate::domain::origin::{OriginSource, OriginSourceType};
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;
use crate::infrastructure::qdrant::{point_id, QdrantClient, QdrantPoint};

pub const DEFAULT_COLLECTION: &str = "documents";

const PREVIEW_CHARS: usize = 200;
const SCROLL_PAGE: usize = 256;

#[derive(Debug)]
pub struct QdrantOriginSource {
    client: QdrantClient,
    collection: String,
}

impl QdrantOriginSource {
    /// Refuses semantic collections, which hold derived chunks
    pub fn new(
        http: Arc<dyn HttpClientTrait>,
        uri: &str,
        api_key: Option<String>,
        collection: Option<String>,
    ) -> Result<Self, DomainError> {
        let collection = collection.unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
        ensure_origin_collection(&collection)?;

        Ok(Self {
            client: QdrantClient::new(http, uri, api_key),
            collection,
        })
    }

    fn origin_error(&self, err: DomainError) -> DomainError {
        DomainError::origin(
            OriginSourceType::Qdrant.as_str(),
            format!("{} ({})", err, self.collection),
        )
    }

    /// Scroll forward until `skip + limit` points are read or the collection ends
    async fn scroll_points(&self, limit: Option<usize>, skip: usize) -> Result<Vec<QdrantPoint>, DomainError> {
        let wanted = limit.map(|l| skip + l);
        let mut collected = Vec::new();
        let mut offset = None;

        loop {
            let page_size = wanted
                .map(|w| (w - collected.len()).min(SCROLL_PAGE))
                .unwrap_or(SCROLL_PAGE);
            if page_size == 0 {
                break;
            }

            let (page, next) = self
                .client
                .scroll(&self.collection, page_size, offset)
                .await
                .map_err(|e| self.origin_error(e))?;
            collected.extend(page);

            match next {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(collected.into_iter().skip(skip).collect())
    }
}

/// Content is `content`, then `text`, then the whole payload as JSON
fn point_content(payload: &Metadata) -> String {
    ["content", "text"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| Value::Object(payload.clone()).to_string())
}

fn point_metadata(payload: &Metadata) -> Metadata {
    payload
        .iter()
        .filter(|(key, _)| key.as_str() != "content" && key.as_str() != "text")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn to_document(point: QdrantPoint, collection: &str) -> OriginDocument {
    let mut document = OriginDocument::new(point.id_string(), point_content(&point.payload))
        .with_metadata(point_metadata(&point.payload));
    document.origin_collection = Some(collection.to_string());
    document
}

#[async_trait]
impl OriginSource for QdrantOriginSource {
    fn source_type(&self) -> OriginSourceType {
        OriginSourceType::Qdrant
    }

    async fn test_connection(&self) -> bool {
        match self.client.list_collections().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, url = %self.client.base_url(), "Qdrant origin unreachable");
                false
            }
        }
    }

    async fn list_documents(
        &self,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<OriginDocumentPreview>, DomainError> {
        let points = self.scroll_points(Some(limit), skip).await?;

        Ok(points
            .into_iter()
            .map(|point| {
                let content = point_content(&point.payload);
                let title = ["title", "file_name"]
                    .iter()
                    .filter_map(|k| point.payload.get(*k))
                    .find_map(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| point.id_string());

                OriginDocumentPreview {
                    origin_id: point.id_string(),
                    title,
                    preview: content.chars().take(PREVIEW_CHARS).collect(),
                    size: content.len(),
                    created_at: None,
                    metadata: point_metadata(&point.payload),
                }
            })
            .collect())
    }

    async fn get_document(&self, origin_id: &str) -> Result<Option<OriginDocument>, DomainError> {
        let points = self
            .client
            .retrieve(&self.collection, vec![point_id(origin_id)])
            .await
            .map_err(|e| self.origin_error(e))?;

        Ok(points
            .into_iter()
            .next()
            .map(|p| to_document(p, &self.collection)))
    }

    async fn fetch_documents(
        &self,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<OriginDocument>, DomainError> {
        Ok(self
            .scroll_points(limit, skip)
            .await?
            .into_iter()
            .map(|p| to_document(p, &self.collection))
            .collect())
    }

    async fn close(&self) {}
}

//! Origin source factory

use std::sync::Arc;

use async_trait::async_trait;

use super::{FilesystemOriginSource, MongoOriginSource, QdrantOriginSource};
use crate::domain::origin::{
    OriginConnectionConfig, OriginSource, OriginSourceFactory, OriginSourceType,
};
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;
use crate::infrastructure::mongo::MongoTimeouts;

/// Builds the concrete origin for a source type; the single dispatch point
/// between origin kinds.
#[derive(Debug, Clone)]
pub struct DefaultOriginSourceFactory {
    http: Arc<dyn HttpClientTrait>,
    mongo_timeouts: MongoTimeouts,
}

impl DefaultOriginSourceFactory {
    pub fn new(http: Arc<dyn HttpClientTrait>, mongo_timeouts: MongoTimeouts) -> Self {
        Self {
            http,
            mongo_timeouts,
        }
    }
}

#[async_trait]
impl OriginSourceFactory for DefaultOriginSourceFactory {
    async fn create(
        &self,
        source_type: OriginSourceType,
        config: &OriginConnectionConfig,
    ) -> Result<Arc<dyn OriginSource>, DomainError> {
        config.validate_for(source_type)?;

        let required = |value: &Option<String>, field: &str| {
            value.clone().ok_or_else(|| {
                DomainError::validation(format!("{} origin requires '{}'", source_type, field))
            })
        };

        let source: Arc<dyn OriginSource> = match source_type {
            OriginSourceType::Mongodb => Arc::new(
                MongoOriginSource::connect(
                    &required(&config.uri, "uri")?,
                    &required(&config.database_name, "database_name")?,
                    &required(&config.collection_name, "collection_name")?,
                    self.mongo_timeouts,
                )
                .await?,
            ),
            OriginSourceType::Qdrant => Arc::new(QdrantOriginSource::new(
                self.http.clone(),
                &required(&config.uri, "uri")?,
                config.api_key.clone(),
                config.collection_name.clone(),
            )?),
            OriginSourceType::Filesystem => Arc::new(
                FilesystemOriginSource::open(required(&config.base_path, "base_path")?).await?,
            ),
            OriginSourceType::FileUpload => {
                return Err(DomainError::validation(
                    "file_upload should use store_raw_document directly",
                ));
            }
        };

        tracing::debug!(source_type = %source_type, "Created origin source");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::mock::MockHttpClient;

    fn factory() -> DefaultOriginSourceFactory {
        DefaultOriginSourceFactory::new(Arc::new(MockHttpClient::new()), MongoTimeouts::default())
    }

    #[tokio::test]
    async fn test_creates_filesystem_origin() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = OriginConnectionConfig::filesystem(dir.path().to_string_lossy());

        let source = factory()
            .create(OriginSourceType::Filesystem, &config)
            .await
            .unwrap();
        assert_eq!(source.source_type(), OriginSourceType::Filesystem);
    }

    #[tokio::test]
    async fn test_creates_qdrant_origin() {
        let config = OriginConnectionConfig {
            uri: Some("http://qdrant:6333".to_string()),
            ..Default::default()
        };

        let source = factory().create(OriginSourceType::Qdrant, &config).await.unwrap();
        assert_eq!(source.source_type(), OriginSourceType::Qdrant);
    }

    #[tokio::test]
    async fn test_rejects_semantic_qdrant_collection() {
        let config = OriginConnectionConfig {
            uri: Some("http://qdrant:6333".to_string()),
            collection_name: Some("docs_semantic".to_string()),
            ..Default::default()
        };

        let err = factory()
            .create(OriginSourceType::Qdrant, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(err.to_string().contains("semantic collection"));
    }

    #[tokio::test]
    async fn test_rejects_file_upload_and_missing_fields() {
        let err = factory()
            .create(OriginSourceType::FileUpload, &OriginConnectionConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("store_raw_document"));

        let err = factory()
            .create(OriginSourceType::Mongodb, &OriginConnectionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}

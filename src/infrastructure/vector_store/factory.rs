//! Provider construction keyed by connection provider type

use std::sync::Arc;

use async_trait::async_trait;

use super::{MongoVectorStore, PineconeVectorStore, QdrantVectorStore, RedisVectorStore};
use crate::domain::connection::Connection;
use crate::domain::vector_store::{ProviderType, VectorStoreFactory, VectorStoreProvider};
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;
use crate::infrastructure::mongo::MongoTimeouts;

/// Mongo settings applied to every mongo connection
#[derive(Debug, Clone)]
pub struct MongoVectorDefaults {
    pub database: String,
    pub collection: String,
    pub index_name: String,
    pub timeouts: MongoTimeouts,
}

#[derive(Debug, Clone)]
pub struct DefaultVectorStoreFactory {
    http: Arc<dyn HttpClientTrait>,
    mongo: MongoVectorDefaults,
}

impl DefaultVectorStoreFactory {
    pub fn new(http: Arc<dyn HttpClientTrait>, mongo: MongoVectorDefaults) -> Self {
        Self { http, mongo }
    }
}

#[async_trait]
impl VectorStoreFactory for DefaultVectorStoreFactory {
    async fn create(
        &self,
        connection: &Connection,
    ) -> Result<Arc<dyn VectorStoreProvider>, DomainError> {
        connection.validate()?;

        let provider: Arc<dyn VectorStoreProvider> = match connection.provider {
            ProviderType::Mongo => Arc::new(
                MongoVectorStore::connect(
                    &connection.uri,
                    &self.mongo.database,
                    &self.mongo.collection,
                    &self.mongo.index_name,
                    self.mongo.timeouts,
                )
                .await?,
            ),
            ProviderType::Redis => Arc::new(RedisVectorStore::connect(&connection.uri).await?),
            ProviderType::Qdrant => Arc::new(QdrantVectorStore::new(
                self.http.clone(),
                &connection.uri,
                connection.api_key.clone(),
            )),
            ProviderType::Pinecone => Arc::new(PineconeVectorStore::new(
                self.http.clone(),
                &connection.uri,
                connection.api_key.clone(),
            )?),
        };

        tracing::debug!(
            connection_id = %connection.connection_id,
            provider = %connection.provider,
            "Created vector store provider"
        );
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::mock::MockHttpClient;

    fn factory() -> DefaultVectorStoreFactory {
        DefaultVectorStoreFactory::new(
            Arc::new(MockHttpClient::new()),
            MongoVectorDefaults {
                database: "srugenai_db".to_string(),
                collection: "documents".to_string(),
                index_name: "vector_index".to_string(),
                timeouts: MongoTimeouts::default(),
            },
        )
    }

    #[tokio::test]
    async fn test_creates_rest_providers() {
        let qdrant = Connection::new("local-qdrant", ProviderType::Qdrant, "http://qdrant:6333");
        let provider = factory().create(&qdrant).await.unwrap();
        assert_eq!(provider.provider_type(), "qdrant");

        let pinecone = Connection::new("pc", ProviderType::Pinecone, "https://api.pinecone.io")
            .with_api_key("pk");
        let provider = factory().create(&pinecone).await.unwrap();
        assert_eq!(provider.provider_type(), "pinecone");
    }

    #[tokio::test]
    async fn test_rejects_invalid_connection() {
        let pinecone = Connection::new("pc", ProviderType::Pinecone, "https://api.pinecone.io");
        assert!(factory().create(&pinecone).await.is_err());

        let bad_id = Connection::new("a:b", ProviderType::Qdrant, "http://qdrant:6333");
        assert!(factory().create(&bad_id).await.is_err());
    }

    #[tokio::test]
    async fn test_mongo_provider_is_lazy() {
        let mongo = Connection::new("atlas", ProviderType::Mongo, "mongodb://localhost:27017");
        let provider = factory().create(&mongo).await.unwrap();
        assert_eq!(provider.provider_type(), "mongo");
    }
}

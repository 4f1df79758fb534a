//! Connection record persistence

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use crate::domain::connection::{ConnectionRepository, StoredConnection};
use crate::domain::DomainError;
use crate::infrastructure::mongo::storage_error;

/// One document per connection, unique on `connection_id`
#[derive(Debug, Clone)]
pub struct MongoConnectionRepository {
    collection: Collection<StoredConnection>,
}

impl MongoConnectionRepository {
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            collection: client.database(database).collection(collection),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), DomainError> {
        let index = IndexModel::builder()
            .keys(doc! {"connection_id": 1})
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection
            .create_index(index)
            .await
            .map_err(|e| storage_error("Failed to create connection index", e))?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionRepository for MongoConnectionRepository {
    async fn upsert(&self, connection: StoredConnection) -> Result<(), DomainError> {
        self.collection
            .replace_one(doc! {"connection_id": &connection.connection_id}, &connection)
            .upsert(true)
            .await
            .map_err(|e| storage_error("Failed to save connection", e))?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        connection_id: &str,
    ) -> Result<Option<StoredConnection>, DomainError> {
        self.collection
            .find_one(doc! {"connection_id": connection_id})
            .await
            .map_err(|e| storage_error("Failed to load connection", e))
    }

    async fn list(&self) -> Result<Vec<StoredConnection>, DomainError> {
        self.collection
            .find(doc! {})
            .sort(doc! {"connection_id": 1})
            .await
            .map_err(|e| storage_error("Failed to list connections", e))?
            .try_collect()
            .await
            .map_err(|e| storage_error("Failed to read connections", e))
    }

    async fn delete(&self, connection_id: &str) -> Result<bool, DomainError> {
        let result = self
            .collection
            .delete_one(doc! {"connection_id": connection_id})
            .await
            .map_err(|e| storage_error("Failed to delete connection", e))?;
        Ok(result.deleted_count > 0)
    }
}

//! Connection records held in memory for tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::connection::{ConnectionRepository, StoredConnection};
use crate::domain::DomainError;

#[derive(Debug, Clone, Default)]
pub struct InMemoryConnectionRepository {
    connections: Arc<RwLock<HashMap<String, StoredConnection>>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn upsert(&self, connection: StoredConnection) -> Result<(), DomainError> {
        self.connections
            .write()
            .await
            .insert(connection.connection_id.clone(), connection);
        Ok(())
    }

    async fn find_by_id(
        &self,
        connection_id: &str,
    ) -> Result<Option<StoredConnection>, DomainError> {
        Ok(self.connections.read().await.get(connection_id).cloned())
    }

    async fn list(&self) -> Result<Vec<StoredConnection>, DomainError> {
        let mut connections: Vec<StoredConnection> =
            self.connections.read().await.values().cloned().collect();
        connections.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        Ok(connections)
    }

    async fn delete(&self, connection_id: &str) -> Result<bool, DomainError> {
        Ok(self.connections.write().await.remove(connection_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::ConnectionStatus;
    use crate::domain::vector_store::ProviderType;
    use chrono::Utc;

    fn stored(id: &str) -> StoredConnection {
        StoredConnection {
            connection_id: id.to_string(),
            provider: ProviderType::Qdrant,
            display_name: id.to_string(),
            encrypted_uri: "ciphertext".to_string(),
            encrypted_api_key: None,
            scopes: vec![],
            status: ConnectionStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_crud() {
        let repo = InMemoryConnectionRepository::new();
        repo.upsert(stored("b")).await.unwrap();
        repo.upsert(stored("a")).await.unwrap();

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.connection_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(repo.find_by_id("a").await.unwrap().is_some());
        assert!(repo.delete("a").await.unwrap());
        assert!(!repo.delete("a").await.unwrap());
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let repo = InMemoryConnectionRepository::new();
        let mut updated = stored("a");
        updated.display_name = "Renamed".to_string();

        tokio_test::block_on(async {
            repo.upsert(stored("a")).await.unwrap();
            repo.upsert(updated).await.unwrap();
        });

        let all = tokio_test::block_on(repo.list()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name, "Renamed");
    }
}

//! Connection registry: encrypted persistence plus provider construction

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::domain::connection::{
    Connection, ConnectionRepository, ConnectionStatus, ConnectionSummary, SecretCipher,
    StoredConnection,
};
use crate::domain::vector_store::{VectorStoreFactory, VectorStoreProvider};
use crate::domain::DomainError;

/// Outcome of probing a connection
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConnectionTestResult {
    pub connection_id: String,
    pub success: bool,
    pub message: String,
}

pub struct ConnectionRegistry {
    repository: Arc<dyn ConnectionRepository>,
    cipher: Arc<dyn SecretCipher>,
    factory: Arc<dyn VectorStoreFactory>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("cipher", &self.cipher)
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    pub fn new(
        repository: Arc<dyn ConnectionRepository>,
        cipher: Arc<dyn SecretCipher>,
        factory: Arc<dyn VectorStoreFactory>,
    ) -> Self {
        Self {
            repository,
            cipher,
            factory,
        }
    }

    fn seal(&self, connection: &Connection) -> Result<StoredConnection, DomainError> {
        Ok(StoredConnection {
            connection_id: connection.connection_id.clone(),
            provider: connection.provider,
            display_name: connection.display_name.clone(),
            encrypted_uri: self.cipher.encrypt(&connection.uri)?,
            encrypted_api_key: connection
                .api_key
                .as_deref()
                .map(|k| self.cipher.encrypt(k))
                .transpose()?,
            scopes: connection.scopes.clone(),
            status: connection.status,
            created_at: connection.created_at,
        })
    }

    fn open(&self, stored: StoredConnection) -> Result<Connection, DomainError> {
        Ok(Connection {
            uri: self.cipher.decrypt(&stored.encrypted_uri)?,
            api_key: stored
                .encrypted_api_key
                .as_deref()
                .map(|k| self.cipher.decrypt(k))
                .transpose()?,
            connection_id: stored.connection_id,
            provider: stored.provider,
            display_name: stored.display_name,
            scopes: stored.scopes,
            status: stored.status,
            created_at: stored.created_at,
        })
    }

    /// Validate, encrypt and save; an existing id is replaced
    pub async fn register(&self, connection: Connection) -> Result<ConnectionSummary, DomainError> {
        connection.validate()?;
        let stored = self.seal(&connection)?;
        let summary = ConnectionSummary::from(&stored);

        self.repository.upsert(stored).await?;
        info!(
            connection_id = %connection.connection_id,
            provider = %connection.provider,
            "Registered connection"
        );
        Ok(summary)
    }

    /// Connection with decrypted credentials
    pub async fn get(&self, connection_id: &str) -> Result<Connection, DomainError> {
        let stored = self
            .repository
            .find_by_id(connection_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Connection '{}' not found", connection_id)))?;
        self.open(stored)
    }

    /// Summaries only; nothing is decrypted
    pub async fn list(&self) -> Result<Vec<ConnectionSummary>, DomainError> {
        Ok(self
            .repository
            .list()
            .await?
            .iter()
            .map(ConnectionSummary::from)
            .collect())
    }

    /// Active connections, decrypted. Records that fail to decrypt are skipped.
    pub async fn active(&self) -> Result<Vec<Connection>, DomainError> {
        let mut connections = Vec::new();
        for stored in self.repository.list().await? {
            if stored.status != ConnectionStatus::Active {
                continue;
            }
            let connection_id = stored.connection_id.clone();
            match self.open(stored) {
                Ok(connection) => connections.push(connection),
                Err(e) => warn!(connection_id = %connection_id, error = %e, "Skipping unreadable connection"),
            }
        }
        Ok(connections)
    }

    /// Decrypted connections for the given ids; unknown ids are an error
    pub async fn resolve(&self, connection_ids: &[String]) -> Result<Vec<Connection>, DomainError> {
        stream::iter(connection_ids)
            .then(|id| self.get(id))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    pub async fn delete(&self, connection_id: &str) -> Result<(), DomainError> {
        if !self.repository.delete(connection_id).await? {
            return Err(DomainError::not_found(format!(
                "Connection '{}' not found",
                connection_id
            )));
        }
        info!(connection_id, "Deleted connection");
        Ok(())
    }

    pub async fn provider(&self, connection: &Connection) -> Result<Arc<dyn VectorStoreProvider>, DomainError> {
        self.factory.create(connection).await
    }

    /// Build the provider, probe it and release it
    pub async fn test(&self, connection_id: &str) -> Result<ConnectionTestResult, DomainError> {
        let connection = self.get(connection_id).await?;

        let (success, message) = match self.factory.create(&connection).await {
            Ok(provider) => {
                let ok = provider.test_connection().await;
                provider.close().await;
                if ok {
                    (true, "Connection successful".to_string())
                } else {
                    (false, "Connection test failed".to_string())
                }
            }
            Err(e) => (false, e.to_string()),
        };

        Ok(ConnectionTestResult {
            connection_id: connection_id.to_string(),
            success,
            message,
        })
    }
}

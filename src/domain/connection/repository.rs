//! Connection repository trait

use async_trait::async_trait;

use super::StoredConnection;
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Persistence for connection records (credentials already encrypted)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Insert or replace by `connection_id`
    async fn upsert(&self, connection: StoredConnection) -> Result<(), DomainError>;

    async fn find_by_id(&self, connection_id: &str)
        -> Result<Option<StoredConnection>, DomainError>;

    async fn list(&self) -> Result<Vec<StoredConnection>, DomainError>;

    /// Returns whether a record was removed
    async fn delete(&self, connection_id: &str) -> Result<bool, DomainError>;
}

//! Connection entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::vector_store::ProviderType;
use crate::domain::DomainError;

/// Maximum length for connection IDs
pub const MAX_CONNECTION_ID_LENGTH: usize = 64;

/// Permission granted to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionScope {
    #[serde(rename = "list.indexes")]
    ListIndexes,
    #[serde(rename = "read.metadata")]
    ReadMetadata,
    #[serde(rename = "read.vectors")]
    ReadVectors,
    #[serde(rename = "write.vectors")]
    WriteVectors,
}

impl ConnectionScope {
    pub const ALL: [ConnectionScope; 4] = [
        Self::ListIndexes,
        Self::ReadMetadata,
        Self::ReadVectors,
        Self::WriteVectors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListIndexes => "list.indexes",
            Self::ReadMetadata => "read.metadata",
            Self::ReadVectors => "read.vectors",
            Self::WriteVectors => "write.vectors",
        }
    }
}

impl fmt::Display for ConnectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionScope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "Invalid scope '{}'. Must be one of: list.indexes, read.metadata, read.vectors, write.vectors",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Active,
    Inactive,
    Error,
}

/// A registered vector store connection with decrypted credentials.
///
/// Only the registry sees this form; persisted records hold ciphertext.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub provider: ProviderType,
    pub display_name: String,
    pub uri: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub scopes: Vec<ConnectionScope>,
    #[serde(default)]
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(
        connection_id: impl Into<String>,
        provider: ProviderType,
        uri: impl Into<String>,
    ) -> Self {
        let connection_id = connection_id.into();

        Self {
            display_name: connection_id.clone(),
            connection_id,
            provider,
            uri: uri.into(),
            api_key: None,
            scopes: vec![ConnectionScope::ReadVectors],
            status: ConnectionStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<ConnectionScope>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn has_scope(&self, scope: ConnectionScope) -> bool {
        self.scopes.contains(&scope)
    }

    /// Validate identifiers and required credentials.
    ///
    /// Connection IDs may not contain `:` because collection specs use it
    /// as the `connection_id:collection` separator.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_connection_id(&self.connection_id)?;

        if self.uri.trim().is_empty() {
            return Err(DomainError::validation("Connection URI cannot be empty"));
        }

        if self.provider == ProviderType::Pinecone
            && self.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            return Err(DomainError::validation("Pinecone requires an API key"));
        }

        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connection_id", &self.connection_id)
            .field("provider", &self.provider)
            .field("display_name", &self.display_name)
            .field("uri", &"[REDACTED]")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("scopes", &self.scopes)
            .field("status", &self.status)
            .finish()
    }
}

pub fn validate_connection_id(id: &str) -> Result<(), DomainError> {
    if id.is_empty() {
        return Err(DomainError::invalid_id("Connection ID cannot be empty"));
    }

    if id.len() > MAX_CONNECTION_ID_LENGTH {
        return Err(DomainError::invalid_id(format!(
            "Connection ID too long: {} characters (max {})",
            id.len(),
            MAX_CONNECTION_ID_LENGTH
        )));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DomainError::invalid_id(format!(
            "Invalid connection ID '{}': use letters, digits, '-' and '_'",
            id
        )));
    }

    Ok(())
}

/// Persisted form of a connection; secrets are ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConnection {
    pub connection_id: String,
    pub provider: ProviderType,
    pub display_name: String,
    pub encrypted_uri: String,
    #[serde(default)]
    pub encrypted_api_key: Option<String>,
    #[serde(default)]
    pub scopes: Vec<ConnectionScope>,
    #[serde(default)]
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

/// Listing view of a connection without any credential material
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSummary {
    pub connection_id: String,
    pub provider: ProviderType,
    pub display_name: String,
    pub scopes: Vec<ConnectionScope>,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredConnection> for ConnectionSummary {
    fn from(stored: &StoredConnection) -> Self {
        Self {
            connection_id: stored.connection_id.clone(),
            provider: stored.provider,
            display_name: stored.display_name.clone(),
            scopes: stored.scopes.clone(),
            status: stored.status,
            created_at: stored.created_at,
        }
    }
}

//! Origin source trait and connection configuration

use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::document::{OriginDocument, OriginDocumentPreview};
use crate::domain::DomainError;

/// External system a raw document was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginSourceType {
    Mongodb,
    Qdrant,
    Filesystem,
    FileUpload,
}

impl OriginSourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mongodb => "mongodb",
            Self::Qdrant => "qdrant",
            Self::Filesystem => "filesystem",
            Self::FileUpload => "file_upload",
        }
    }
}

impl fmt::Display for OriginSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OriginSourceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::Mongodb),
            "qdrant" => Ok(Self::Qdrant),
            "filesystem" => Ok(Self::Filesystem),
            "file_upload" => Ok(Self::FileUpload),
            other => Err(DomainError::validation(format!(
                "Unsupported origin source type: {}",
                other
            ))),
        }
    }
}

/// Connection parameters for an origin source; which fields apply depends
/// on the source type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct OriginConnectionConfig {
    #[validate(length(min = 1))]
    pub uri: Option<String>,
    pub api_key: Option<String>,
    #[validate(length(min = 1))]
    pub database_name: Option<String>,
    #[validate(length(min = 1))]
    pub collection_name: Option<String>,
    #[validate(length(min = 1))]
    pub base_path: Option<String>,
}

impl OriginConnectionConfig {
    pub fn mongodb(
        uri: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            uri: Some(uri.into()),
            database_name: Some(database.into()),
            collection_name: Some(collection.into()),
            ..Default::default()
        }
    }

    pub fn filesystem(base_path: impl Into<String>) -> Self {
        Self {
            base_path: Some(base_path.into()),
            ..Default::default()
        }
    }

    /// Check that the fields required by `source_type` are present.
    pub fn validate_for(&self, source_type: OriginSourceType) -> Result<(), DomainError> {
        self.validate()
            .map_err(|e| DomainError::validation(format!("Invalid connection config: {}", e)))?;

        let missing = |field: &str| {
            DomainError::validation(format!(
                "{} origin requires '{}' in connection config",
                source_type, field
            ))
        };

        match source_type {
            OriginSourceType::Mongodb => {
                if self.uri.is_none() {
                    return Err(missing("uri"));
                }
                if self.database_name.is_none() {
                    return Err(missing("database_name"));
                }
                if self.collection_name.is_none() {
                    return Err(missing("collection_name"));
                }
            }
            OriginSourceType::Qdrant => {
                if self.uri.is_none() {
                    return Err(missing("uri"));
                }
            }
            OriginSourceType::Filesystem => {
                if self.base_path.is_none() {
                    return Err(missing("base_path"));
                }
            }
            OriginSourceType::FileUpload => {
                return Err(DomainError::validation(
                    "file_upload should use store_raw_document directly",
                ));
            }
        }

        Ok(())
    }
}

/// A readable external system that documents are ingested from.
#[async_trait]
pub trait OriginSource: Send + Sync + Debug {
    fn source_type(&self) -> OriginSourceType;

    /// Check reachability; never fails
    async fn test_connection(&self) -> bool;

    /// List document previews, skipping `skip` and returning at most `limit`
    async fn list_documents(
        &self,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<OriginDocumentPreview>, DomainError>;

    /// Fetch one normalized document; `Ok(None)` when the id is unknown
    async fn get_document(&self, origin_id: &str) -> Result<Option<OriginDocument>, DomainError>;

    /// Fetch full normalized documents for bulk sync
    async fn fetch_documents(
        &self,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<OriginDocument>, DomainError>;

    /// Fetch documents created or modified at or after `since`.
    ///
    /// Sources without change tracking fall back to a full fetch.
    async fn fetch_new_documents(
        &self,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<OriginDocument>, DomainError> {
        tracing::warn!(
            source_type = %self.source_type(),
            since = %since,
            "Origin has no change tracking, fetching all documents"
        );
        self.fetch_documents(limit, 0).await
    }

    /// Release connections; safe to call more than once
    async fn close(&self);
}

/// Builds origin sources from a type and connection config.
#[async_trait]
pub trait OriginSourceFactory: Send + Sync + Debug {
    async fn create(
        &self,
        source_type: OriginSourceType,
        config: &OriginConnectionConfig,
    ) -> Result<Arc<dyn OriginSource>, DomainError>;
}

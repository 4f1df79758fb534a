//! Raw document repository trait

use async_trait::async_trait;

use crate::domain::document::{
    RawDocument, RawDocumentFilter, RawDocumentStatus, StatusCounts, UpsertOutcome,
};
use crate::domain::error::DomainError;
use crate::domain::origin::OriginSourceType;

#[cfg(test)]
use mockall::automock;

/// Default page size for listing raw documents
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Persistence for raw documents.
///
/// At most one document exists per `(origin_id, origin_source_type)`;
/// implementations enforce this with an atomic upsert keyed on that pair.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RawDocumentRepository: Send + Sync {
    /// Upsert by `(origin_id, origin_source_type)`.
    ///
    /// When a document already exists it keeps its `raw_document_id`; with
    /// `overwrite` its content and metadata are replaced and the status is
    /// reset to pending, otherwise it is left untouched.
    async fn upsert(
        &self,
        document: RawDocument,
        overwrite: bool,
    ) -> Result<UpsertOutcome, DomainError>;

    async fn get(&self, raw_document_id: &str) -> Result<Option<RawDocument>, DomainError>;

    async fn get_by_origin_id(
        &self,
        origin_id: &str,
        source_type: Option<OriginSourceType>,
    ) -> Result<Option<RawDocument>, DomainError>;

    async fn is_origin_ingested(
        &self,
        origin_id: &str,
        source_type: Option<OriginSourceType>,
    ) -> Result<bool, DomainError>;

    /// Newest first
    async fn list(
        &self,
        filter: RawDocumentFilter,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<RawDocument>, DomainError>;

    async fn update_status(
        &self,
        raw_document_id: &str,
        status: RawDocumentStatus,
        error_message: Option<String>,
    ) -> Result<(), DomainError>;

    /// Returns whether a document was removed
    async fn delete(&self, raw_document_id: &str) -> Result<bool, DomainError>;

    async fn count_by_status(&self) -> Result<StatusCounts, DomainError>;
}

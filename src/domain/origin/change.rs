//! Change notifications from an origin

use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::domain::DomainError;

/// A document written in the origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub doc_id: String,
    /// `insert`, `update` or `replace`
    pub operation_type: String,
}

impl ChangeEvent {
    pub fn new(doc_id: impl Into<String>, operation_type: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            operation_type: operation_type.into(),
        }
    }
}

pub type ChangeStream = BoxStream<'static, Result<ChangeEvent, DomainError>>;

/// Opens a stream of write events. The stream may end or fail; callers
/// re-open it.
#[async_trait]
pub trait ChangeEventSource: Send + Sync + Debug {
    async fn open(&self) -> Result<ChangeStream, DomainError>;
}

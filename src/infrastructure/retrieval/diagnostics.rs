//! Zero-result diagnostics

use std::sync::Arc;

use tracing::info;

use crate::domain::collection::is_raw_document_collection;
use crate::domain::connection::Connection;
use crate::domain::retrieval::RetrievalDiagnosis;
use crate::domain::vector_store::VectorStoreFactory;

/// Explains why a collection returned nothing for a query
#[derive(Debug, Clone)]
pub struct CollectionDiagnostics {
    factory: Arc<dyn VectorStoreFactory>,
}

impl CollectionDiagnostics {
    pub fn new(factory: Arc<dyn VectorStoreFactory>) -> Self {
        Self { factory }
    }

    pub async fn diagnose(
        &self,
        connection: &Connection,
        collection: Option<&str>,
        query_embedding: &[f32],
    ) -> RetrievalDiagnosis {
        if let Some(collection) = collection.filter(|c| is_raw_document_collection(c)) {
            return RetrievalDiagnosis::RawDocumentCollection {
                collection: collection.to_string(),
            };
        }

        let provider = match self.factory.create(connection).await {
            Ok(provider) => provider,
            Err(e) => {
                return RetrievalDiagnosis::SearchError {
                    message: e.to_string(),
                }
            }
        };

        let diagnosis = provider.diagnose(query_embedding, collection).await;
        provider.close().await;

        info!(
            connection_id = %connection.connection_id,
            collection = collection.unwrap_or("<default>"),
            diagnosis = %diagnosis,
            "Diagnosed empty retrieval"
        );
        diagnosis
    }
}

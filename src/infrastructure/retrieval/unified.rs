//! Multi-connection, multi-collection retrieval

use std::cmp::Ordering;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error};

use crate::domain::connection::Connection;
use crate::domain::vector_store::{ProviderType, VectorSearchResult, VectorStoreFactory};

/// One connection and the collections to search on it.
/// `None` stands for the provider's default collection.
#[derive(Debug, Clone)]
pub struct SearchTarget {
    pub connection: Connection,
    pub collections: Vec<Option<String>>,
}

/// Map collection specs onto connections.
///
/// - `conn:coll` applies to that connection only
/// - `db.coll` applies to every mongo connection
/// - a bare name applies to every connection
///
/// A connection left without collections searches its default collection.
pub fn plan_targets(connections: &[Connection], collection_specs: &[String]) -> Vec<SearchTarget> {
    connections
        .iter()
        .map(|connection| {
            let mut collections: Vec<Option<String>> = Vec::new();

            for spec in collection_specs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
                let collection = match spec.split_once(':') {
                    Some((connection_id, collection)) => {
                        (connection_id == connection.connection_id).then_some(collection)
                    }
                    None if spec.contains('.') => {
                        (connection.provider == ProviderType::Mongo).then_some(spec)
                    }
                    None => Some(spec),
                };

                if let Some(collection) = collection.map(str::to_string) {
                    if !collections.contains(&Some(collection.clone())) {
                        collections.push(Some(collection));
                    }
                }
            }

            if collections.is_empty() {
                collections.push(None);
            }

            SearchTarget {
                connection: connection.clone(),
                collections,
            }
        })
        .collect()
}

/// Drop content-less hits, normalize, rank by score and keep `top_k`.
///
/// Equal scores are ordered by `chunk_id`, then by connection id.
pub fn merge_results(results: Vec<VectorSearchResult>, top_k: usize) -> Vec<VectorSearchResult> {
    let mut merged: Vec<VectorSearchResult> = results
        .into_iter()
        .filter(VectorSearchResult::has_content)
        .map(VectorSearchResult::normalize)
        .collect();

    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
            .then_with(|| a.connection_id.cmp(&b.connection_id))
    });
    merged.truncate(top_k);
    merged
}

/// Fans a query embedding out over connections with bounded concurrency.
///
/// Each connection gets its own provider for the duration of the search and
/// the provider is closed afterwards. A connection that cannot be reached
/// contributes no results.
#[derive(Debug, Clone)]
pub struct UnifiedRetrieval {
    factory: Arc<dyn VectorStoreFactory>,
    max_concurrency: usize,
}

impl UnifiedRetrieval {
    pub fn new(factory: Arc<dyn VectorStoreFactory>, max_concurrency: usize) -> Self {
        Self {
            factory,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn search(
        &self,
        query_embedding: &[f32],
        targets: &[SearchTarget],
        top_k: usize,
    ) -> Vec<VectorSearchResult> {
        let gathered: Vec<Vec<VectorSearchResult>> = stream::iter(targets)
            .map(|target| self.search_target(query_embedding, target, top_k))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let merged = merge_results(gathered.into_iter().flatten().collect(), top_k);
        debug!(
            targets = targets.len(),
            results = merged.len(),
            "Unified retrieval finished"
        );
        merged
    }

    async fn search_target(
        &self,
        query_embedding: &[f32],
        target: &SearchTarget,
        top_k: usize,
    ) -> Vec<VectorSearchResult> {
        let connection = &target.connection;
        let provider = match self.factory.create(connection).await {
            Ok(provider) => provider,
            Err(e) => {
                error!(
                    connection_id = %connection.connection_id,
                    error = %e,
                    "Skipping connection, provider unavailable"
                );
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for collection in &target.collections {
            let hits = provider
                .vector_search(query_embedding, top_k, collection.as_deref())
                .await;
            debug!(
                connection_id = %connection.connection_id,
                collection = collection.as_deref().unwrap_or("<default>"),
                hits = hits.len(),
                "Searched collection"
            );
            results.extend(
                hits.into_iter()
                    .map(|hit| hit.tagged(&connection.connection_id, provider.provider_type())),
            );
        }

        provider.close().await;
        results
    }
}

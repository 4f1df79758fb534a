//! Explanations for a retrieval that produced no results

use std::fmt;

use serde::Serialize;

/// Why a query against a collection returned nothing.
///
/// Each variant points at a different fix, so callers surface the message
/// instead of a generic "no answer".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievalDiagnosis {
    RawDocumentCollection {
        collection: String,
    },
    EmptyCollection {
        collection: String,
    },
    NoEmbeddings {
        collection: String,
        documents: u64,
    },
    DimensionMismatch {
        collection: String,
        stored: usize,
        query: usize,
    },
    MissingVectorIndex {
        database: String,
        collection: String,
        index_name: String,
    },
    SearchError {
        message: String,
    },
    NoRelevantContent,
}

impl RetrievalDiagnosis {
    /// True when the collection is usable and simply had no close match
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::NoRelevantContent)
    }

    pub fn message(&self) -> String {
        match self {
            Self::RawDocumentCollection { collection } => format!(
                "Collection '{}' is a raw document store and cannot be queried directly. \
                 Select the corresponding vector collection (e.g., 'srugenai_db.movies').",
                collection
            ),
            Self::EmptyCollection { collection } => format!(
                "Collection '{}' is empty. Ingest and process documents before querying it.",
                collection
            ),
            Self::NoEmbeddings {
                collection,
                documents,
            } => format!(
                "Collection '{}' has {} documents but none of them have embeddings. \
                 Process the raw documents to generate embeddings.",
                collection, documents
            ),
            Self::DimensionMismatch {
                collection,
                stored,
                query,
            } => format!(
                "Collection '{}' stores {}-dimension embeddings but the query embedding has {} dimensions. \
                 Re-embed the collection with the configured embedding model.",
                collection, stored, query
            ),
            Self::MissingVectorIndex {
                database,
                collection,
                index_name,
            } => format!(
                "Collection '{db}.{coll}' does not have a vector search index. \
                 Only vector collections with embeddings can be queried.\n\n\
                 To fix this:\n\
                 1. Open the MongoDB Atlas cluster and go to the Search tab\n\
                 2. Create a Vector Search index:\n\
                 \x20  - Index Name: {index}\n\
                 \x20  - Database: {db}\n\
                 \x20  - Collection: {coll}\n\
                 \x20  - Vector field: embedding (cosine similarity)\n\
                 3. Wait for the index to become active and retry the query",
                db = database,
                coll = collection,
                index = index_name
            ),
            Self::SearchError { message } => format!("Vector search failed: {}", message),
            Self::NoRelevantContent => {
                "No semantically relevant content was found for this query.".to_string()
            }
        }
    }
}

impl fmt::Display for RetrievalDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_distinct() {
        let diagnoses = [
            RetrievalDiagnosis::RawDocumentCollection {
                collection: "raw_documents".to_string(),
            },
            RetrievalDiagnosis::EmptyCollection {
                collection: "movies_semantic".to_string(),
            },
            RetrievalDiagnosis::NoEmbeddings {
                collection: "movies".to_string(),
                documents: 10,
            },
            RetrievalDiagnosis::MissingVectorIndex {
                database: "srugenai_db".to_string(),
                collection: "movies".to_string(),
                index_name: "vector_index".to_string(),
            },
            RetrievalDiagnosis::SearchError {
                message: "timeout".to_string(),
            },
            RetrievalDiagnosis::NoRelevantContent,
        ];

        let messages: std::collections::HashSet<String> =
            diagnoses.iter().map(|d| d.message()).collect();
        assert_eq!(messages.len(), diagnoses.len());
    }

    #[test]
    fn test_missing_index_message_names_target() {
        let message = RetrievalDiagnosis::MissingVectorIndex {
            database: "srugenai_db".to_string(),
            collection: "movies".to_string(),
            index_name: "vector_index".to_string(),
        }
        .message();

        assert!(message.contains("Index Name: vector_index"));
        assert!(message.contains("Database: srugenai_db"));
        assert!(message.contains("Collection: movies"));
    }

    #[test]
    fn test_is_healthy() {
        assert!(RetrievalDiagnosis::NoRelevantContent.is_healthy());
        assert!(
            !RetrievalDiagnosis::SearchError {
                message: "x".to_string()
            }
            .is_healthy()
        );
    }
}

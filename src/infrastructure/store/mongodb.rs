//! MongoDB-backed raw document and semantic chunk stores

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use crate::domain::collection::CollectionNamespace;
use crate::domain::document::{
    RawDocument, RawDocumentFilter, RawDocumentStatus, SemanticChunk, StatusCounts, UpsertOutcome,
};
use crate::domain::origin::OriginSourceType;
use crate::domain::store::{RawDocumentRepository, SemanticChunkRepository};
use crate::domain::DomainError;
use crate::infrastructure::mongo::{
    bson_datetime_to_chrono, chrono_to_bson, document_to_map, embedding_to_bson, map_to_document,
    storage_error,
};

/// Raw documents in one collection, unique on `(origin_id, origin_source_type)`
#[derive(Debug, Clone)]
pub struct MongoRawDocumentRepository {
    collection: Collection<Document>,
}

impl MongoRawDocumentRepository {
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            collection: client.database(database).collection(collection),
        }
    }

    /// Create the unique origin index and the listing indexes
    pub async fn ensure_indexes(&self) -> Result<(), DomainError> {
        let unique = IndexModel::builder()
            .keys(doc! {"origin_id": 1, "origin_source_type": 1})
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("origin_unique".to_string())
                    .build(),
            )
            .build();

        let secondary = [
            doc! {"raw_document_id": 1},
            doc! {"status": 1},
            doc! {"origin_source_type": 1, "origin_source_id": 1},
            doc! {"created_at": -1},
        ];

        self.collection
            .create_index(unique)
            .await
            .map_err(|e| storage_error("Failed to create unique origin index", e))?;

        for keys in secondary {
            self.collection
                .create_index(IndexModel::builder().keys(keys).build())
                .await
                .map_err(|e| storage_error("Failed to create index", e))?;
        }

        info!(collection = %self.collection.name(), "Raw document indexes ready");
        Ok(())
    }

    fn origin_filter(origin_id: &str, source_type: Option<OriginSourceType>) -> Document {
        let mut filter = doc! {"origin_id": origin_id};
        if let Some(source_type) = source_type {
            filter.insert("origin_source_type", source_type.as_str());
        }
        filter
    }
}

fn optional_string(value: &Option<String>) -> Bson {
    value.clone().map(Bson::String).unwrap_or(Bson::Null)
}

fn raw_to_document(raw: &RawDocument) -> Result<Document, DomainError> {
    Ok(doc! {
        "raw_document_id": &raw.raw_document_id,
        "origin_source_type": raw.origin_source_type.as_str(),
        "origin_source_id": optional_string(&raw.origin_source_id),
        "origin_id": &raw.origin_id,
        "raw_content": &raw.raw_content,
        "content_type": &raw.content_type,
        "metadata": map_to_document(&raw.metadata)?,
        "status": raw.status.as_str(),
        "created_at": chrono_to_bson(raw.created_at),
        "updated_at": chrono_to_bson(raw.updated_at),
        "processed_at": raw.processed_at.map(chrono_to_bson).map(Bson::DateTime).unwrap_or(Bson::Null),
        "error_message": optional_string(&raw.error_message),
    })
}

fn document_to_raw(document: &Document) -> Result<RawDocument, DomainError> {
    let text = |key: &str| document.get_str(key).ok().map(str::to_string);
    let required = |key: &str| {
        text(key).ok_or_else(|| DomainError::storage(format!("Raw document is missing '{}'", key)))
    };
    let date = |key: &str| {
        document
            .get_datetime(key)
            .ok()
            .and_then(|d| bson_datetime_to_chrono(*d))
    };

    let created_at = date("created_at").unwrap_or_else(Utc::now);

    Ok(RawDocument {
        raw_document_id: required("raw_document_id")?,
        origin_source_type: required("origin_source_type")?.parse::<OriginSourceType>()?,
        origin_source_id: text("origin_source_id"),
        origin_id: required("origin_id")?,
        raw_content: text("raw_content").unwrap_or_default(),
        content_type: text("content_type").unwrap_or_else(|| "text".to_string()),
        metadata: document
            .get_document("metadata")
            .map(document_to_map)
            .unwrap_or_default(),
        status: text("status")
            .map(|s| s.parse::<RawDocumentStatus>())
            .transpose()?
            .unwrap_or_default(),
        created_at,
        updated_at: date("updated_at").unwrap_or(created_at),
        processed_at: date("processed_at"),
        error_message: text("error_message"),
    })
}

fn filter_document(filter: &RawDocumentFilter) -> Document {
    let mut query = Document::new();
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(source_type) = filter.origin_source_type {
        query.insert("origin_source_type", source_type.as_str());
    }
    if let Some(ref source_id) = filter.origin_source_id {
        query.insert("origin_source_id", source_id.as_str());
    }
    query
}

#[async_trait]
impl RawDocumentRepository for MongoRawDocumentRepository {
    /// A single `find_one_and_update` with upsert: `$setOnInsert` carries the
    /// identity fields, so a concurrent duplicate resolves to the existing
    /// record rather than a second insert.
    async fn upsert(
        &self,
        document: RawDocument,
        overwrite: bool,
    ) -> Result<UpsertOutcome, DomainError> {
        let filter = Self::origin_filter(&document.origin_id, Some(document.origin_source_type));
        let mut full = raw_to_document(&document)?;

        let update = if overwrite {
            let mut on_insert = Document::new();
            for key in ["raw_document_id", "origin_id", "origin_source_type", "created_at", "processed_at"] {
                if let Some(value) = full.remove(key) {
                    on_insert.insert(key, value);
                }
            }
            full.insert("status", RawDocumentStatus::Pending.as_str());
            full.insert("error_message", Bson::Null);
            doc! {"$set": full, "$setOnInsert": on_insert}
        } else {
            doc! {"$setOnInsert": full}
        };

        let stored = self
            .collection
            .find_one_and_update(filter, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| storage_error("Failed to upsert raw document", e))?
            .ok_or_else(|| DomainError::storage("Upsert returned no document"))?;

        let raw_document_id = stored
            .get_str("raw_document_id")
            .map_err(|_| DomainError::storage("Stored raw document has no raw_document_id"))?
            .to_string();
        let was_duplicate = raw_document_id != document.raw_document_id;

        debug!(
            raw_document_id = %raw_document_id,
            origin_id = %document.origin_id,
            was_duplicate,
            "Upserted raw document"
        );

        Ok(UpsertOutcome {
            raw_document_id,
            was_duplicate,
        })
    }

    async fn get(&self, raw_document_id: &str) -> Result<Option<RawDocument>, DomainError> {
        self.collection
            .find_one(doc! {"raw_document_id": raw_document_id})
            .await
            .map_err(|e| storage_error("Failed to get raw document", e))?
            .map(|d| document_to_raw(&d))
            .transpose()
    }

    async fn get_by_origin_id(
        &self,
        origin_id: &str,
        source_type: Option<OriginSourceType>,
    ) -> Result<Option<RawDocument>, DomainError> {
        self.collection
            .find_one(Self::origin_filter(origin_id, source_type))
            .await
            .map_err(|e| storage_error("Failed to get raw document by origin id", e))?
            .map(|d| document_to_raw(&d))
            .transpose()
    }

    async fn is_origin_ingested(
        &self,
        origin_id: &str,
        source_type: Option<OriginSourceType>,
    ) -> Result<bool, DomainError> {
        let count = self
            .collection
            .count_documents(Self::origin_filter(origin_id, source_type))
            .limit(1)
            .await
            .map_err(|e| storage_error("Failed to check origin", e))?;
        Ok(count > 0)
    }

    async fn list(
        &self,
        filter: RawDocumentFilter,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<RawDocument>, DomainError> {
        let documents: Vec<Document> = self
            .collection
            .find(filter_document(&filter))
            .sort(doc! {"created_at": -1})
            .skip(skip as u64)
            .limit(limit as i64)
            .await
            .map_err(|e| storage_error("Failed to list raw documents", e))?
            .try_collect()
            .await
            .map_err(|e| storage_error("Failed to read raw documents", e))?;

        documents.iter().map(document_to_raw).collect()
    }

    async fn update_status(
        &self,
        raw_document_id: &str,
        status: RawDocumentStatus,
        error_message: Option<String>,
    ) -> Result<(), DomainError> {
        let now = chrono_to_bson(Utc::now());
        let mut set = doc! {"status": status.as_str(), "updated_at": now};

        match status {
            RawDocumentStatus::Failed => {
                set.insert("error_message", optional_string(&error_message));
            }
            _ => {
                set.insert("error_message", Bson::Null);
            }
        }
        if status == RawDocumentStatus::Processed {
            set.insert("processed_at", now);
        }

        let result = self
            .collection
            .update_one(doc! {"raw_document_id": raw_document_id}, doc! {"$set": set})
            .await
            .map_err(|e| storage_error("Failed to update raw document status", e))?;

        if result.matched_count == 0 {
            return Err(DomainError::not_found(format!(
                "Raw document {} not found",
                raw_document_id
            )));
        }

        Ok(())
    }

    async fn delete(&self, raw_document_id: &str) -> Result<bool, DomainError> {
        let result = self
            .collection
            .delete_one(doc! {"raw_document_id": raw_document_id})
            .await
            .map_err(|e| storage_error("Failed to delete raw document", e))?;
        Ok(result.deleted_count > 0)
    }

    async fn count_by_status(&self) -> Result<StatusCounts, DomainError> {
        let pipeline = vec![doc! {"$group": {"_id": "$status", "count": {"$sum": 1}}}];
        let groups: Vec<Document> = self
            .collection
            .aggregate(pipeline)
            .await
            .map_err(|e| storage_error("Failed to count raw documents", e))?
            .try_collect()
            .await
            .map_err(|e| storage_error("Failed to read status counts", e))?;

        let mut counts = StatusCounts::default();
        for group in groups {
            let Ok(status) = group.get_str("_id").unwrap_or_default().parse::<RawDocumentStatus>() else {
                continue;
            };
            let count = match group.get("count") {
                Some(Bson::Int32(n)) => *n as u64,
                Some(Bson::Int64(n)) => *n as u64,
                _ => 0,
            };
            counts.add(status, count);
        }

        Ok(counts)
    }
}

/// Semantic chunks, one document per chunk with `_id = origin_id:chunk_id`
#[derive(Debug, Clone)]
pub struct MongoSemanticChunkRepository {
    client: Client,
}

impl MongoSemanticChunkRepository {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn collection(&self, namespace: &CollectionNamespace) -> Collection<Document> {
        self.client
            .database(&namespace.database)
            .collection(&namespace.collection)
    }
}

fn semantic_to_document(chunk: &SemanticChunk) -> Result<Document, DomainError> {
    Ok(doc! {
        "_id": chunk.key(),
        "origin_id": &chunk.origin_id,
        "chunk_id": &chunk.chunk_id,
        "chunk_text": &chunk.chunk_text,
        "embedding": embedding_to_bson(&chunk.embedding),
        "metadata": map_to_document(&chunk.metadata)?,
        "updated_at": chrono_to_bson(Utc::now()),
    })
}

#[async_trait]
impl SemanticChunkRepository for MongoSemanticChunkRepository {
    async fn upsert_chunks(
        &self,
        namespace: &CollectionNamespace,
        chunks: Vec<SemanticChunk>,
    ) -> Result<usize, DomainError> {
        let collection = self.collection(namespace);
        let mut stored = 0;

        for chunk in &chunks {
            let document = semantic_to_document(chunk)?;
            collection
                .replace_one(doc! {"_id": chunk.key()}, document)
                .upsert(true)
                .await
                .map_err(|e| storage_error("Failed to upsert semantic chunk", e))?;
            stored += 1;
        }

        debug!(namespace = %namespace, stored, "Upserted semantic chunks");
        Ok(stored)
    }

    async fn has_origin(
        &self,
        namespace: &CollectionNamespace,
        origin_id: &str,
    ) -> Result<bool, DomainError> {
        let count = self
            .collection(namespace)
            .count_documents(doc! {"origin_id": origin_id})
            .limit(1)
            .await
            .map_err(|e| storage_error("Failed to check semantic origin", e))?;
        Ok(count > 0)
    }

    async fn delete_by_origin(
        &self,
        namespace: &CollectionNamespace,
        origin_id: &str,
    ) -> Result<u64, DomainError> {
        let result = self
            .collection(namespace)
            .delete_many(doc! {"origin_id": origin_id})
            .await
            .map_err(|e| storage_error("Failed to delete semantic chunks", e))?;
        Ok(result.deleted_count)
    }

    async fn count(&self, namespace: &CollectionNamespace) -> Result<u64, DomainError> {
        self.collection(namespace)
            .count_documents(doc! {})
            .await
            .map_err(|e| storage_error("Failed to count semantic chunks", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_document_bson_round_trip() {
        let mut raw = RawDocument::new(OriginSourceType::Mongodb, "507f", "content")
            .with_source_id(Some("srugenai_db.movies".to_string()))
            .with_metadata(json!({"title": "Sample"}).as_object().cloned().unwrap());
        raw.set_status(RawDocumentStatus::Failed, Some("boom".to_string()));

        let document = raw_to_document(&raw).unwrap();
        assert_eq!(document.get_str("origin_source_type").unwrap(), "mongodb");
        assert_eq!(document.get_str("status").unwrap(), "failed");

        let back = document_to_raw(&document).unwrap();
        assert_eq!(back.raw_document_id, raw.raw_document_id);
        assert_eq!(back.origin_source_id.as_deref(), Some("srugenai_db.movies"));
        assert_eq!(back.metadata["title"], "Sample");
        assert_eq!(back.status, RawDocumentStatus::Failed);
        assert_eq!(back.error_message.as_deref(), Some("boom"));
        assert_eq!(
            back.created_at.timestamp_millis(),
            raw.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_filter_document() {
        let filter = RawDocumentFilter::default()
            .with_status(RawDocumentStatus::Pending)
            .with_source_id("src-1");

        assert_eq!(
            filter_document(&filter),
            doc! {"status": "pending", "origin_source_id": "src-1"}
        );
        assert_eq!(filter_document(&RawDocumentFilter::default()), doc! {});
    }

    #[test]
    fn test_semantic_document_uses_composite_id() {
        let chunk = SemanticChunk {
            origin_id: "507f".to_string(),
            chunk_id: "chunk_0".to_string(),
            chunk_text: "text".to_string(),
            embedding: vec![0.5; 3],
            metadata: Default::default(),
        };

        let document = semantic_to_document(&chunk).unwrap();
        assert_eq!(document.get_str("_id").unwrap(), "507f:chunk_0");
        assert_eq!(document.get_array("embedding").unwrap().len(), 3);
    }
}

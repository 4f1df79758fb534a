//! MongoDB collection as an origin source

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Client, Collection};
use tracing::{debug, info, warn};

use super::extractor::extract_text_content;
use crate::domain::collection::ensure_origin_collection;
use crate::domain::document::{OriginDocument, OriginDocumentPreview};
use crate::domain::origin::{OriginSource, OriginSourceType};
use crate::domain::DomainError;
use crate::infrastructure::mongo::{
    bson_datetime_to_chrono, chrono_to_bson, connect, document_to_map, id_to_string,
    object_id_lower_bound, object_id_timestamp, ping, MongoTimeouts,
};

/// Fields holding an explicit modification time, most specific first
const UPDATED_FIELDS: [&str; 5] = [
    "updated_at",
    "updatedAt",
    "last_modified",
    "modified_at",
    "modifiedAt",
];

/// Fields queried for incremental sync
const SYNC_FIELDS: [&str; 3] = ["updated_at", "updatedAt", "last_modified"];

const CREATED_FIELDS: [&str; 3] = ["created_at", "createdAt", "timestamp"];

/// Fields already represented by the extracted content
const CONTENT_FIELDS: [&str; 4] = ["_id", "content", "text", "body"];

const TITLE_FIELDS: [&str; 3] = ["title", "name", "display_name"];

const PREVIEW_CHARS: usize = 200;

fn origin_error(message: impl Into<String>) -> DomainError {
    DomainError::origin(OriginSourceType::Mongodb.as_str(), message)
}

/// Read-only view over one origin collection
#[derive(Debug)]
pub struct MongoOriginSource {
    client: Client,
    database: String,
    collection: String,
}

impl MongoOriginSource {
    /// Connect to `database.collection`.
    ///
    /// Semantic collections hold derived chunks and are refused as origins.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        timeouts: MongoTimeouts,
    ) -> Result<Self, DomainError> {
        ensure_origin_collection(collection)?;

        let client = connect(uri, "pmp-rag-origin", timeouts).await?;
        if !ping(&client).await {
            return Err(origin_error(format!(
                "Failed to connect to origin {}.{}",
                database, collection
            )));
        }

        info!(database = %database, collection = %collection, "Connected to MongoDB origin");

        Ok(Self {
            client,
            database: database.to_string(),
            collection: collection.to_string(),
        })
    }

    fn collection(&self) -> Collection<Document> {
        self.client
            .database(&self.database)
            .collection(&self.collection)
    }

    async fn find_normalized(
        &self,
        filter: Document,
        sort: Document,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<OriginDocument>, DomainError> {
        let collection = self.collection();
        let mut find = collection.find(filter).sort(sort);
        if skip > 0 {
            find = find.skip(skip as u64);
        }
        if let Some(limit) = limit {
            find = find.limit(limit as i64);
        }

        let raw: Vec<Document> = find
            .await
            .map_err(|e| origin_error(format!("Query failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| origin_error(format!("Cursor failed: {}", e)))?;

        let documents: Vec<OriginDocument> = raw
            .iter()
            .map(|d| normalize_document(d, &self.database, &self.collection))
            .collect();

        debug!(
            count = documents.len(),
            database = %self.database,
            collection = %self.collection,
            "Fetched origin documents"
        );

        Ok(documents)
    }

    async fn has_any(&self, filter: Document) -> Result<bool, DomainError> {
        self.collection()
            .find_one(filter)
            .await
            .map(|d| d.is_some())
            .map_err(|e| origin_error(format!("Query failed: {}", e)))
    }
}

#[async_trait]
impl OriginSource for MongoOriginSource {
    fn source_type(&self) -> OriginSourceType {
        OriginSourceType::Mongodb
    }

    async fn test_connection(&self) -> bool {
        ping(&self.client).await
    }

    async fn list_documents(
        &self,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<OriginDocumentPreview>, DomainError> {
        let documents = self
            .find_normalized(doc! {}, doc! {"_id": 1}, Some(limit), skip)
            .await?;

        Ok(documents.into_iter().map(preview).collect())
    }

    async fn get_document(&self, origin_id: &str) -> Result<Option<OriginDocument>, DomainError> {
        let id = match ObjectId::parse_str(origin_id) {
            Ok(oid) => Bson::ObjectId(oid),
            Err(_) => Bson::String(origin_id.to_string()),
        };

        let document = self
            .collection()
            .find_one(doc! {"_id": id})
            .await
            .map_err(|e| origin_error(format!("Error fetching document {}: {}", origin_id, e)))?;

        Ok(document.map(|d| normalize_document(&d, &self.database, &self.collection)))
    }

    async fn fetch_documents(
        &self,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<OriginDocument>, DomainError> {
        self.find_normalized(doc! {}, doc! {"_id": 1}, limit, skip)
            .await
    }

    /// Three tiers: explicit timestamp fields, then the creation time inside
    /// ObjectId keys, then a full fetch.
    async fn fetch_new_documents(
        &self,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<OriginDocument>, DomainError> {
        let exists: Vec<Document> = SYNC_FIELDS
            .iter()
            .map(|f| field_condition(f, doc! {"$exists": true}))
            .collect();

        if self.has_any(doc! {"$or": exists}).await? {
            let since = chrono_to_bson(since);
            let newer: Vec<Document> = SYNC_FIELDS
                .iter()
                .map(|f| field_condition(f, doc! {"$gte": since}))
                .collect();

            return self
                .find_normalized(doc! {"$or": newer}, doc! {"updated_at": 1}, limit, 0)
                .await;
        }

        if self.has_any(doc! {"_id": {"$type": "objectId"}}).await? {
            debug!(
                collection = %self.collection,
                "No timestamp fields found, using ObjectId creation time"
            );
            let lower = object_id_lower_bound(since);
            return self
                .find_normalized(doc! {"_id": {"$gte": lower}}, doc! {"_id": 1}, limit, 0)
                .await;
        }

        warn!(
            database = %self.database,
            collection = %self.collection,
            since = %since,
            "No timestamp fields or ObjectId keys, incremental filtering is not possible; fetching all documents"
        );
        self.find_normalized(doc! {}, doc! {"_id": 1}, limit, 0)
            .await
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

fn field_condition(field: &str, condition: Document) -> Document {
    let mut filter = Document::new();
    filter.insert(field, condition);
    filter
}

/// Normalize a raw record into the common origin shape
pub fn normalize_document(document: &Document, database: &str, collection: &str) -> OriginDocument {
    let origin_id = document.get("_id").map(id_to_string).unwrap_or_default();

    let record = document_to_map(document);
    let content = extract_text_content(&record);

    let metadata = record
        .into_iter()
        .filter(|(key, _)| !CONTENT_FIELDS.contains(&key.as_str()))
        .collect();

    OriginDocument::new(origin_id, content)
        .with_metadata(metadata)
        .with_collection(database, collection)
        .with_updated_at(updated_at(document))
}

/// Modification time: explicit fields first, then the ObjectId creation
/// time, then creation fields.
pub fn updated_at(document: &Document) -> Option<DateTime<Utc>> {
    if let Some(value) = UPDATED_FIELDS.iter().find_map(|f| document.get(*f)) {
        return parse_timestamp(value);
    }

    match document.get("_id") {
        Some(Bson::ObjectId(oid)) => return object_id_timestamp(oid),
        Some(Bson::DateTime(dt)) => return bson_datetime_to_chrono(*dt),
        _ => {}
    }

    CREATED_FIELDS
        .iter()
        .find_map(|f| document.get(*f))
        .and_then(parse_timestamp)
}

fn parse_timestamp(value: &Bson) -> Option<DateTime<Utc>> {
    match value {
        Bson::DateTime(dt) => bson_datetime_to_chrono(*dt),
        Bson::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

fn parse_timestamp_str(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn preview(document: OriginDocument) -> OriginDocumentPreview {
    let title = TITLE_FIELDS
        .iter()
        .filter_map(|f| document.metadata.get(*f))
        .filter_map(|v| v.as_str())
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| document.origin_id.clone());

    OriginDocumentPreview {
        title,
        preview: document.content.chars().take(PREVIEW_CHARS).collect(),
        size: document.content.len(),
        created_at: document.updated_at,
        origin_id: document.origin_id,
        metadata: document.metadata,
    }
}

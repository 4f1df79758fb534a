//! MongoDB client construction and BSON <-> JSON conversion

use std::time::Duration;

use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::Client;
use serde_json::Value;

use crate::domain::document::Metadata;
use crate::domain::DomainError;

/// Timeouts applied to every client this crate opens
#[derive(Debug, Clone, Copy)]
pub struct MongoTimeouts {
    pub connect: Duration,
    pub server_selection: Duration,
}

impl Default for MongoTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            server_selection: Duration::from_secs(30),
        }
    }
}

/// `mongodb+srv` URIs without an explicit retryWrites get
/// `retryWrites=true&w=majority` appended.
pub fn normalize_uri(uri: &str) -> String {
    if !uri.starts_with("mongodb+srv://") || uri.contains("retryWrites") {
        return uri.to_string();
    }

    let separator = if uri.contains('?') { '&' } else { '?' };
    let base = if separator == '?' && !uri.trim_start_matches("mongodb+srv://").contains('/') {
        format!("{}/", uri)
    } else {
        uri.to_string()
    };

    format!("{}{}retryWrites=true&w=majority", base, separator)
}

/// Open a client with explicit timeouts. Connecting is lazy; callers that
/// need reachability should ping.
pub async fn connect(
    uri: &str,
    app_name: &str,
    timeouts: MongoTimeouts,
) -> Result<Client, DomainError> {
    let mut options = ClientOptions::parse(normalize_uri(uri))
        .await
        .map_err(|e| DomainError::configuration(format!("Invalid MongoDB URI: {}", e)))?;

    options.app_name = Some(app_name.to_string());
    options.connect_timeout = Some(timeouts.connect);
    options.server_selection_timeout = Some(timeouts.server_selection);

    Client::with_options(options)
        .map_err(|e| DomainError::storage(format!("Failed to create MongoDB client: {}", e)))
}

/// Run `ping` against the admin database
pub async fn ping(client: &Client) -> bool {
    match client
        .database("admin")
        .run_command(bson::doc! {"ping": 1})
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "MongoDB ping failed");
            false
        }
    }
}

/// Map a driver error into a storage error, keeping the driver message so
/// duplicate-key failures remain recognisable.
pub fn storage_error(context: &str, error: mongodb::error::Error) -> DomainError {
    DomainError::storage(format!("{}: {}", context, error))
}

/// String form of a record id: ObjectIds as hex, strings as is
pub fn id_to_string(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => match bson_to_json(other) {
            Value::String(s) => s,
            value => value.to_string(),
        },
    }
}

/// Convert BSON into plain JSON: ObjectIds become hex strings and dates
/// become RFC 3339 strings.
pub fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s.clone()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => bson_datetime_to_chrono(*dt)
            .map(|d| Value::String(d.to_rfc3339()))
            .unwrap_or(Value::Null),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(document_to_map(doc)),
        other => other.clone().into_relaxed_extjson(),
    }
}

pub fn document_to_map(document: &Document) -> Metadata {
    document
        .iter()
        .map(|(key, value)| (key.clone(), bson_to_json(value)))
        .collect()
}

pub fn map_to_document(map: &Metadata) -> Result<Document, DomainError> {
    bson::to_document(map)
        .map_err(|e| DomainError::internal(format!("Failed to convert metadata to BSON: {}", e)))
}

pub fn bson_datetime_to_chrono(value: bson::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value.timestamp_millis())
}

pub fn chrono_to_bson(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(value.timestamp_millis())
}

/// Smallest ObjectId generated at or after `since`; ObjectIds embed their
/// creation second in the first four bytes.
pub fn object_id_lower_bound(since: DateTime<Utc>) -> ObjectId {
    let seconds = since.timestamp().clamp(0, u32::MAX as i64) as u32;
    let mut bytes = [0u8; 12];
    bytes[..4].copy_from_slice(&seconds.to_be_bytes());
    ObjectId::from_bytes(bytes)
}

pub fn object_id_timestamp(oid: &ObjectId) -> Option<DateTime<Utc>> {
    bson_datetime_to_chrono(oid.timestamp())
}

/// Embedding as BSON doubles
pub fn embedding_to_bson(embedding: &[f32]) -> Bson {
    Bson::Array(embedding.iter().map(|v| Bson::Double(*v as f64)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::doc;
    use serde_json::json;

    #[test]
    fn test_normalize_srv_uri() {
        assert_eq!(
            normalize_uri("mongodb+srv://u:p@cluster.example.net/db"),
            "mongodb+srv://u:p@cluster.example.net/db?retryWrites=true&w=majority"
        );
        assert_eq!(
            normalize_uri("mongodb+srv://u:p@cluster.example.net/?appName=x"),
            "mongodb+srv://u:p@cluster.example.net/?appName=x&retryWrites=true&w=majority"
        );
        assert_eq!(
            normalize_uri("mongodb+srv://cluster.example.net"),
            "mongodb+srv://cluster.example.net/?retryWrites=true&w=majority"
        );
        assert_eq!(normalize_uri("mongodb://localhost:27017"), "mongodb://localhost:27017");
        assert_eq!(
            normalize_uri("mongodb+srv://c.net/?retryWrites=false"),
            "mongodb+srv://c.net/?retryWrites=false"
        );
    }

    #[test]
    fn test_bson_to_json() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let document = doc! {
            "_id": oid,
            "title": "Sample",
            "year": 1999_i32,
            "rating": 8.7,
            "tags": ["a", "b"],
            "nested": {"x": true},
            "released": bson::DateTime::from_millis(0),
        };

        let map = document_to_map(&document);
        assert_eq!(map["_id"], json!("507f1f77bcf86cd799439011"));
        assert_eq!(map["year"], json!(1999));
        assert_eq!(map["rating"], json!(8.7));
        assert_eq!(map["tags"], json!(["a", "b"]));
        assert_eq!(map["nested"], json!({"x": true}));
        assert_eq!(map["released"], json!("1970-01-01T00:00:00+00:00"));

        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys[0], "_id");
        assert_eq!(keys[1], "title");
    }

    #[test]
    fn test_object_id_lower_bound() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let oid = object_id_lower_bound(since);

        assert_eq!(object_id_timestamp(&oid), Some(since));
        assert_eq!(&oid.bytes()[4..], &[0u8; 8]);
    }
}

//! Redis (RediSearch) vector store provider

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Value as RedisValue};
use serde_json::Value;
use tracing::{error, info, warn};

use super::{chunk_record, require_embedding};
use crate::domain::document::{DocumentChunk, Metadata};
use crate::domain::retrieval::RetrievalDiagnosis;
use crate::domain::vector_store::{VectorSearchResult, VectorStoreProvider};
use crate::domain::DomainError;

const PROVIDER: &str = "redis";
const DEFAULT_INDEX: &str = "documents";
const SCORE_FIELD: &str = "vector_score";
const DELETE_PAGE: usize = 10_000;

/// Hash fields returned by a search
const RETURN_FIELDS: [&str; 10] = [
    "chunk_id",
    "document_id",
    "file_name",
    "content",
    "line_start",
    "line_end",
    "metadata",
    "origin_id",
    "raw_document_id",
    SCORE_FIELD,
];

fn redis_error(context: &str, err: redis::RedisError) -> DomainError {
    DomainError::provider(PROVIDER, format!("{}: {}", context, err))
}

/// Hashes under `{index}:` with an HNSW cosine index on `embedding`
#[derive(Clone)]
pub struct RedisVectorStore {
    connection: ConnectionManager,
    default_index: String,
}

impl fmt::Debug for RedisVectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisVectorStore")
            .field("default_index", &self.default_index)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisVectorStore {
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let client = Client::open(url)
            .map_err(|e| DomainError::configuration(format!("Invalid Redis URL: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| redis_error("Failed to connect to Redis", e))?;

        Ok(Self {
            connection,
            default_index: DEFAULT_INDEX.to_string(),
        })
    }

    pub fn with_default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = index.into();
        self
    }

    fn index<'a>(&'a self, collection: Option<&'a str>) -> &'a str {
        collection.unwrap_or(&self.default_index)
    }

    async fn index_info(&self, index: &str) -> Result<HashMap<String, RedisValue>, DomainError> {
        let mut conn = self.connection.clone();
        let info: RedisValue = redis::cmd("FT.INFO")
            .arg(index)
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("FT.INFO failed", e))?;
        Ok(pairs(&info))
    }

    async fn create_index(&self, index: &str, dimension: usize) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("FT.CREATE")
            .arg(index)
            .arg("ON")
            .arg("HASH")
            .arg("PREFIX")
            .arg(1)
            .arg(format!("{}:", index))
            .arg("SCHEMA")
            .arg("content")
            .arg("TEXT")
            .arg("file_name")
            .arg("TEXT")
            .arg("chunk_id")
            .arg("TAG")
            .arg("document_id")
            .arg("TAG")
            .arg("raw_document_id")
            .arg("TAG")
            .arg("origin_id")
            .arg("TAG")
            .arg("embedding")
            .arg("VECTOR")
            .arg("HNSW")
            .arg(6)
            .arg("TYPE")
            .arg("FLOAT32")
            .arg("DIM")
            .arg(dimension)
            .arg("DISTANCE_METRIC")
            .arg("COSINE")
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("FT.CREATE failed", e))?;

        info!(index, dimension, "Created RediSearch index");
        Ok(())
    }

    async fn delete_matching(&self, index: &str, field: &str, value: &str) -> Result<u64, DomainError> {
        let mut conn = self.connection.clone();
        let query = format!("@{}:{{{}}}", field, escape_tag(value));

        let response: RedisValue = redis::cmd("FT.SEARCH")
            .arg(index)
            .arg(query)
            .arg("NOCONTENT")
            .arg("LIMIT")
            .arg(0)
            .arg(DELETE_PAGE)
            .arg("DIALECT")
            .arg(2)
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("FT.SEARCH failed", e))?;

        let keys = search_keys(&response);
        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = redis::cmd("DEL")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("DEL failed", e))?;
        Ok(deleted)
    }
}

/// Little-endian FLOAT32 blob
pub fn embedding_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Cosine distance to similarity
pub fn distance_to_similarity(distance: f64) -> f64 {
    1.0 - distance
}

/// Escape TAG query punctuation
fn escape_tag(value: &str) -> String {
    value
        .chars()
        .flat_map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                vec![c]
            } else {
                vec!['\\', c]
            }
        })
        .collect()
}

fn as_text(value: &RedisValue) -> Option<String> {
    match value {
        RedisValue::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        RedisValue::SimpleString(s) => Some(s.clone()),
        RedisValue::Int(n) => Some(n.to_string()),
        RedisValue::Double(f) => Some(f.to_string()),
        _ => None,
    }
}

fn num_docs(info: &HashMap<String, RedisValue>) -> u64 {
    info.get("num_docs")
        .and_then(as_text)
        .and_then(|n| n.parse::<f64>().ok())
        .map(|n| n as u64)
        .unwrap_or(0)
}

fn is_unknown_index(err: &DomainError) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("unknown index name") || message.contains("no such index")
}

/// Classify an `FT.INFO` reply for an empty search
fn diagnose_index_info(
    index: &str,
    info: Result<HashMap<String, RedisValue>, DomainError>,
) -> RetrievalDiagnosis {
    match info {
        Ok(info) if num_docs(&info) == 0 => RetrievalDiagnosis::EmptyCollection {
            collection: index.to_string(),
        },
        Ok(_) => RetrievalDiagnosis::NoRelevantContent,
        Err(err) if is_unknown_index(&err) => RetrievalDiagnosis::MissingVectorIndex {
            database: PROVIDER.to_string(),
            collection: index.to_string(),
            index_name: index.to_string(),
        },
        Err(err) => RetrievalDiagnosis::SearchError {
            message: err.to_string(),
        },
    }
}

/// Flat `[k1, v1, k2, v2, ...]` reply as a map
fn pairs(value: &RedisValue) -> HashMap<String, RedisValue> {
    match value {
        RedisValue::Array(items) => items
            .chunks(2)
            .filter_map(|pair| match pair {
                [k, v] => as_text(k).map(|k| (k, v.clone())),
                _ => None,
            })
            .collect(),
        RedisValue::Map(entries) => entries
            .iter()
            .filter_map(|(k, v)| as_text(k).map(|k| (k, v.clone())))
            .collect(),
        _ => HashMap::new(),
    }
}

/// `[total, key, [field, value, ...], key, ...]` from FT.SEARCH
fn search_hits(response: &RedisValue) -> Vec<(String, HashMap<String, String>)> {
    let RedisValue::Array(items) = response else {
        return Vec::new();
    };

    items
        .iter()
        .skip(1)
        .collect::<Vec<_>>()
        .chunks(2)
        .filter_map(|hit| match hit {
            [key, fields] => {
                let fields = pairs(fields)
                    .into_iter()
                    .filter_map(|(k, v)| as_text(&v).map(|v| (k, v)))
                    .collect();
                Some((as_text(key)?, fields))
            }
            _ => None,
        })
        .collect()
}

/// Keys from an FT.SEARCH NOCONTENT reply
fn search_keys(response: &RedisValue) -> Vec<String> {
    match response {
        RedisValue::Array(items) => items.iter().skip(1).filter_map(as_text).collect(),
        _ => Vec::new(),
    }
}

fn hit_to_result(key: &str, fields: HashMap<String, String>) -> VectorSearchResult {
    let distance = fields
        .get(SCORE_FIELD)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(1.0);

    let mut record = Metadata::new();
    for (name, value) in fields {
        if name == SCORE_FIELD {
            continue;
        }
        let value = if name == "metadata" {
            serde_json::from_str(&value).unwrap_or(Value::Null)
        } else {
            Value::String(value)
        };
        record.insert(name, value);
    }
    record
        .entry("id")
        .or_insert_with(|| Value::String(key.to_string()));

    VectorSearchResult::from_record(&record, distance_to_similarity(distance))
}

/// Hash fields for a chunk; nested metadata is stored as JSON text
fn hash_fields(chunk: &DocumentChunk) -> Result<Vec<(String, Vec<u8>)>, DomainError> {
    let embedding = require_embedding(PROVIDER, chunk)?;
    let mut fields = Vec::new();

    for (name, value) in chunk_record(chunk) {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            other => other.to_string(),
        };
        fields.push((name, text.into_bytes()));
    }
    fields.push(("embedding".to_string(), embedding_bytes(embedding)));

    Ok(fields)
}

#[async_trait]
impl VectorStoreProvider for RedisVectorStore {
    fn provider_type(&self) -> &'static str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        let mut conn = self.connection.clone();
        let pong: Result<String, redis::RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Redis unreachable");
                false
            }
        }
    }

    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut names: Vec<String> = redis::cmd("FT._LIST")
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("FT._LIST failed", e))?;
        names.sort();
        Ok(names)
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        collection: Option<&str>,
    ) -> Vec<VectorSearchResult> {
        let index = self.index(collection);
        let mut conn = self.connection.clone();

        let mut command = redis::cmd("FT.SEARCH");
        command
            .arg(index)
            .arg(format!("*=>[KNN {} @embedding $vec AS {}]", top_k, SCORE_FIELD))
            .arg("PARAMS")
            .arg(2)
            .arg("vec")
            .arg(embedding_bytes(query_embedding))
            .arg("SORTBY")
            .arg(SCORE_FIELD)
            .arg("RETURN")
            .arg(RETURN_FIELDS.len());
        for field in RETURN_FIELDS {
            command.arg(field);
        }
        command.arg("LIMIT").arg(0).arg(top_k).arg("DIALECT").arg(2);

        let response: Result<RedisValue, redis::RedisError> = command.query_async(&mut conn).await;
        match response {
            Ok(response) => search_hits(&response)
                .into_iter()
                .map(|(key, fields)| hit_to_result(&key, fields))
                .collect(),
            Err(e) => {
                error!(index, error = %e, "Redis vector search failed");
                Vec::new()
            }
        }
    }

    async fn store_chunks(
        &self,
        chunks: &[DocumentChunk],
        collection: Option<&str>,
    ) -> Result<usize, DomainError> {
        let Some(first) = chunks.first() else {
            return Ok(0);
        };
        let index = self.index(collection);

        let hashes = chunks
            .iter()
            .map(|c| Ok((format!("{}:{}", index, c.chunk_id), hash_fields(c)?)))
            .collect::<Result<Vec<_>, DomainError>>()?;

        if self.index_info(index).await.is_err() {
            let dimension = require_embedding(PROVIDER, first)?.len();
            self.create_index(index, dimension).await?;
        }

        let mut pipe = redis::pipe();
        for (key, fields) in &hashes {
            pipe.hset_multiple(key, fields).ignore();
        }

        let mut conn = self.connection.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("HSET failed", e))?;

        Ok(hashes.len())
    }

    async fn delete_by_raw_document_id(
        &self,
        raw_document_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        self.delete_matching(self.index(collection), "raw_document_id", raw_document_id)
            .await
    }

    async fn delete_by_origin_id(
        &self,
        origin_id: &str,
        collection: Option<&str>,
    ) -> Result<u64, DomainError> {
        self.delete_matching(self.index(collection), "origin_id", origin_id)
            .await
    }

    async fn count_chunks(&self, collection: Option<&str>) -> Result<u64, DomainError> {
        let info = self.index_info(self.index(collection)).await?;
        Ok(num_docs(&info))
    }

    async fn diagnose(
        &self,
        _query_embedding: &[f32],
        collection: Option<&str>,
    ) -> RetrievalDiagnosis {
        let index = self.index(collection);
        let info = self.index_info(index).await;
        diagnose_index_info(index, info)
    }

    async fn close(&self) {}
}

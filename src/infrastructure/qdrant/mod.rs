//! Qdrant REST client shared by the origin source and the vector provider

use std::sync::Arc;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::domain::document::Metadata;
use crate::domain::DomainError;
use crate::infrastructure::http::{HttpClientTrait, HttpMethod};

const PROVIDER: &str = "qdrant";

/// Point returned by search, scroll or retrieve
#[derive(Debug, Clone, PartialEq)]
pub struct QdrantPoint {
    pub id: Value,
    pub score: f64,
    pub payload: Metadata,
}

impl QdrantPoint {
    fn from_value(value: &Value) -> Self {
        Self {
            id: value.get("id").cloned().unwrap_or(Value::Null),
            score: value.get("score").and_then(Value::as_f64).unwrap_or(0.0),
            payload: value
                .get("payload")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Point id as text; numeric ids are rendered in decimal
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Point id for an application key: integers are kept, anything else maps
/// to a stable 63-bit id derived from its SHA-256 digest.
pub fn point_id(key: &str) -> Value {
    if let Ok(id) = key.trim().parse::<u64>() {
        return json!(id);
    }

    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    json!(u64::from_be_bytes(bytes) & (i64::MAX as u64))
}

/// Thin wrapper over the Qdrant HTTP API
#[derive(Debug, Clone)]
pub struct QdrantClient {
    http: Arc<dyn HttpClientTrait>,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantClient {
    pub fn new(http: Arc<dyn HttpClientTrait>, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        match self.api_key {
            Some(ref key) => vec![("api-key", key.as_str())],
            None => vec![],
        }
    }

    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, DomainError> {
        let response = self
            .http
            .send(method, &self.url(path), self.headers(), body)
            .await?;

        if !response.is_success() {
            return Err(DomainError::provider(
                PROVIDER,
                format!("{} {} returned {}: {}", method, path, response.status, response.body),
            ));
        }

        Ok(response.json()?.get("result").cloned().unwrap_or(Value::Null))
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let result = self.call(HttpMethod::Get, "/collections", None).await?;

        Ok(result
            .get("collections")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|c| c.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Collection info, or `None` when the collection does not exist
    pub async fn collection_info(&self, collection: &str) -> Result<Option<Value>, DomainError> {
        let path = format!("/collections/{}", collection);
        let response = self
            .http
            .send(HttpMethod::Get, &self.url(&path), self.headers(), None)
            .await?;

        match response.status {
            404 => Ok(None),
            _ => Ok(response.into_json()?.get("result").cloned()),
        }
    }

    /// Configured vector size of a collection, if readable
    pub fn vector_size(info: &Value) -> Option<usize> {
        info.pointer("/config/params/vectors/size")
            .and_then(Value::as_u64)
            .map(|s| s as usize)
    }

    pub async fn create_collection(&self, collection: &str, dimension: usize) -> Result<(), DomainError> {
        let body = json!({"vectors": {"size": dimension, "distance": "Cosine"}});
        self.call(HttpMethod::Put, &format!("/collections/{}", collection), Some(&body))
            .await
            .map(|_| ())
    }

    pub async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<QdrantPoint>, DomainError> {
        let body = json!({"vector": vector, "limit": limit, "with_payload": true});
        let result = self
            .call(
                HttpMethod::Post,
                &format!("/collections/{}/points/search", collection),
                Some(&body),
            )
            .await?;

        Ok(points(&result))
    }

    /// Upsert points given as `{id, vector, payload}` objects
    pub async fn upsert(&self, collection: &str, points: Vec<Value>) -> Result<(), DomainError> {
        let body = json!({ "points": points });
        self.call(
            HttpMethod::Put,
            &format!("/collections/{}/points?wait=true", collection),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    /// One page of points plus the offset of the next page
    pub async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        offset: Option<Value>,
    ) -> Result<(Vec<QdrantPoint>, Option<Value>), DomainError> {
        let mut body = json!({"limit": limit, "with_payload": true, "with_vector": false});
        if let Some(offset) = offset {
            body["offset"] = offset;
        }

        let result = self
            .call(
                HttpMethod::Post,
                &format!("/collections/{}/points/scroll", collection),
                Some(&body),
            )
            .await?;

        let next = result
            .get("next_page_offset")
            .cloned()
            .filter(|v| !v.is_null());

        Ok((points(result.get("points").unwrap_or(&Value::Null)), next))
    }

    pub async fn retrieve(&self, collection: &str, ids: Vec<Value>) -> Result<Vec<QdrantPoint>, DomainError> {
        let body = json!({"ids": ids, "with_payload": true});
        let result = self
            .call(
                HttpMethod::Post,
                &format!("/collections/{}/points", collection),
                Some(&body),
            )
            .await?;

        Ok(points(&result))
    }

    pub async fn count(&self, collection: &str) -> Result<u64, DomainError> {
        let body = json!({"exact": true});
        let result = self
            .call(
                HttpMethod::Post,
                &format!("/collections/{}/points/count", collection),
                Some(&body),
            )
            .await?;

        Ok(result.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Delete points whose payload `key` equals `value`
    pub async fn delete_matching(&self, collection: &str, key: &str, value: &str) -> Result<(), DomainError> {
        let body = json!({
            "filter": {"must": [{"key": key, "match": {"value": value}}]}
        });
        self.call(
            HttpMethod::Post,
            &format!("/collections/{}/points/delete?wait=true", collection),
            Some(&body),
        )
        .await
        .map(|_| ())
    }
}

fn points(result: &Value) -> Vec<QdrantPoint> {
    result
        .as_array()
        .map(|items| items.iter().map(QdrantPoint::from_value).collect())
        .unwrap_or_default()
}

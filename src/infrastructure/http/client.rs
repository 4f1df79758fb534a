use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Status and raw body of a completed request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, DomainError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
            .map_err(|e| DomainError::provider("http", format!("Failed to parse response: {}", e)))
    }

    /// Parse the body, turning a non-2xx status into an error
    pub fn into_json(self) -> Result<Value, DomainError> {
        if !self.is_success() {
            return Err(DomainError::provider(
                "http",
                format!("HTTP {}: {}", self.status, self.body),
            ));
        }
        self.json()
    }
}

/// Trait for HTTP client operations (for mocking)
///
/// `send` fails only on transport errors; the JSON helpers also fail on a
/// non-2xx status.
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: Option<&Value>,
    ) -> Result<HttpResponse, DomainError>;

    async fn get_json(&self, url: &str, headers: Vec<(&str, &str)>) -> Result<Value, DomainError> {
        self.send(HttpMethod::Get, url, headers, None)
            .await?
            .into_json()
    }

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<Value, DomainError> {
        self.send(HttpMethod::Post, url, headers, Some(body))
            .await?
            .into_json()
    }

    async fn put_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<Value, DomainError> {
        self.send(HttpMethod::Put, url, headers, Some(body))
            .await?
            .into_json()
    }
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: Option<&Value>,
    ) -> Result<HttpResponse, DomainError> {
        let mut request = self.client.request(method.into(), url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::provider("http", format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::provider("http", format!("Failed to read body: {}", e)))?;

        if !(200..300).contains(&status) {
            tracing::debug!(method = %method, url = %url, status, "HTTP request returned an error status");
        }

        Ok(HttpResponse { status, body })
    }
}

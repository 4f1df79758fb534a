//! Completion endpoint speaking the Ollama `generate` and OpenAI
//! `completions` response shapes

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::language_model::LanguageModel;
use crate::domain::DomainError;
use crate::infrastructure::http::{HttpClientTrait, HttpMethod};

const PROVIDER: &str = "llm";

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "llama3.2:latest".to_string(),
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

#[derive(Debug)]
pub struct HttpLanguageModel {
    client: Arc<dyn HttpClientTrait>,
    url: String,
    auth_header: Option<String>,
    settings: LlmSettings,
}

impl HttpLanguageModel {
    pub fn new(
        client: Arc<dyn HttpClientTrait>,
        url: impl Into<String>,
        api_key: Option<String>,
        settings: LlmSettings,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            auth_header: api_key
                .filter(|k| !k.is_empty())
                .map(|k| format!("Bearer {}", k)),
            settings,
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        match self.auth_header {
            Some(ref header) => vec![("Authorization", header.as_str())],
            None => vec![],
        }
    }
}

/// Completion text from either `response` or `choices[0].text`
fn completion_text(body: &Value) -> Option<String> {
    body.get("response")
        .and_then(Value::as_str)
        .or_else(|| body.pointer("/choices/0/text").and_then(Value::as_str))
        .map(|s| s.trim().to_string())
}

/// Text shown to the user when generation fails. Transport and status
/// failures already carry their user-facing wording.
pub fn answer_from_error(error: &DomainError) -> String {
    match error {
        DomainError::Provider { message, .. } => message.clone(),
        other => format!("Error generating answer: {}", other),
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError> {
        let body = json!({
            "model": self.settings.model,
            "prompt": prompt,
            "stream": false,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        });

        let response = self
            .client
            .send(HttpMethod::Post, &self.url, self.headers(), Some(&body))
            .await
            .map_err(|e| DomainError::provider(PROVIDER, format!("Error connecting to LLM: {}", e)))?;

        if !response.is_success() {
            return Err(DomainError::provider(
                PROVIDER,
                format!("Error generating answer: {} - {}", response.status, response.body),
            ));
        }

        let parsed = response.json()?;
        completion_text(&parsed).ok_or_else(|| {
            DomainError::provider(
                PROVIDER,
                "Error generating answer: response has neither 'response' nor 'choices[0].text'",
            )
        })
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::mock::MockHttpClient;
    use crate::infrastructure::http::HttpClient;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URL: &str = "http://ollama:11434/api/generate";

    fn model_with(http: MockHttpClient) -> (Arc<MockHttpClient>, HttpLanguageModel) {
        let http = Arc::new(http);
        let model = HttpLanguageModel::new(http.clone(), URL, None, LlmSettings::default());
        (http, model)
    }

    #[tokio::test]
    async fn test_reads_ollama_response() {
        let (http, model) = model_with(
            MockHttpClient::new().with_response(URL, json!({"response": " Paris. ", "done": true})),
        );

        assert_eq!(model.generate("capital?").await.unwrap(), "Paris.");

        let body = http.requests()[0].body.clone().unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["model"], "llama3.2:latest");
    }

    #[tokio::test]
    async fn test_reads_completions_shape() {
        let (_, model) = model_with(
            MockHttpClient::new().with_response(URL, json!({"choices": [{"text": "42"}]})),
        );
        assert_eq!(model.generate("q").await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_error_wording() {
        let (_, model) = model_with(MockHttpClient::new().with_status(URL, 503, json!("overloaded")));
        let err = model.generate("q").await.unwrap_err();
        assert_eq!(answer_from_error(&err), "Error generating answer: 503 - overloaded");

        let (_, model) = model_with(MockHttpClient::new().with_error(URL, "refused"));
        let err = model.generate("q").await.unwrap_err();
        assert!(answer_from_error(&err).starts_with("Error connecting to LLM: "));
    }

    #[tokio::test]
    async fn test_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"prompt": "hello", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "hi"})))
            .mount(&server)
            .await;

        let client = HttpClient::with_timeout(Duration::from_secs(5)).unwrap();
        let model = HttpLanguageModel::new(
            Arc::new(client),
            format!("{}/api/generate", server.uri()),
            Some("key".to_string()),
            LlmSettings::default(),
        );

        assert_eq!(model.generate("hello").await.unwrap(), "hi");
    }
}

use std::time::Duration;

use serde::Deserialize;

use crate::domain::chunking::ChunkingConfig;
use crate::domain::DomainError;
use crate::infrastructure::mongo::MongoTimeouts;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub mongodb: MongoConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub upload: UploadConfig,
    pub security: SecurityConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database_name: String,
    pub raw_collection: String,
    pub vector_collection: String,
    pub vector_index_name: String,
    pub connections_collection: String,
    pub connect_timeout_secs: u64,
    pub server_selection_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_size_mb: u64,
    pub allowed_extensions: Vec<String>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Base64 key for credential encryption, at least 32 bytes
    pub encryption_key: Option<String>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub queue_capacity: usize,
    pub shutdown_timeout_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            database_name: "srugenai_db".to_string(),
            raw_collection: "raw_documents".to_string(),
            vector_collection: "documents".to_string(),
            vector_index_name: "vector_index".to_string(),
            connections_collection: "vector_connections".to_string(),
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 30,
        }
    }
}

impl MongoConfig {
    pub fn timeouts(&self) -> MongoTimeouts {
        MongoTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            server_selection: Duration::from_secs(self.server_selection_timeout_secs),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.uri.trim().is_empty() {
            return Err(DomainError::configuration(
                "mongodb.uri is required (set APP__MONGODB__URI)",
            ));
        }
        Ok(())
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8001".to_string(),
            api_key: None,
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            timeout_secs: 30,
            cache_ttl_secs: 300,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: None,
            model: "llama3.2:latest".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut missing = Vec::new();
        if self.api_url.trim().is_empty() {
            missing.push("llm.api_url (APP__LLM__API_URL)");
        }
        if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            missing.push("llm.api_key (APP__LLM__API_KEY)");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::configuration(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_concurrency: 4,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            allowed_extensions: ["pdf", "txt", "docx", "md"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            shutdown_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Report every missing required setting at once
    pub fn validate(&self) -> Result<(), DomainError> {
        let errors: Vec<String> = [self.mongodb.validate(), self.llm.validate()]
            .into_iter()
            .filter_map(Result::err)
            .map(|e| match e {
                DomainError::Configuration { message } => message,
                other => other.to_string(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::configuration(errors.join("; ")))
        }
    }
}

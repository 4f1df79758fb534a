//! PMP RAG Backend
//!
//! Ingestion and retrieval for retrieval-augmented generation:
//! - Origin documents (MongoDB, Qdrant, filesystem, uploads) become raw documents
//! - Raw documents are chunked, embedded and stored in a vector store
//! - Queries fan out across connections and collections and are answered by an LLM
//! - Change streams keep the raw store in sync in realtime

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use domain::{
    Connection, ConnectionRepository, Embedder, ProviderType, RawDocumentRepository,
    SemanticChunkRepository, VectorStoreFactory,
};
use infrastructure::{
    chunking::RecursiveChunker,
    connection::{AesGcmSecretCipher, ConnectionRegistry, MongoConnectionRepository},
    embedding::{CachedEmbedder, HttpEmbedder},
    http::{HttpClient, HttpClientTrait},
    ingestion::{
        FileUploadIngestor, IngestionPipeline, IngestionPipelineDeps, PlainTextExtractor,
        UploadPolicy,
    },
    llm::{HttpLanguageModel, LlmSettings},
    mongo,
    origin::DefaultOriginSourceFactory,
    rag::RagService,
    retrieval::{CollectionDiagnostics, UnifiedRetrieval},
    store::{MongoRawDocumentRepository, MongoSemanticChunkRepository},
    vector_store::{DefaultVectorStoreFactory, MongoVectorDefaults, MongoVectorStore},
};
use mongodb::Client;
use tracing::info;

/// Id of the connection built from the `mongodb` config section
pub const DEFAULT_CONNECTION_ID: &str = "default";

/// Services shared by the CLI commands
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub mongo: Client,
    pub raw_store: Arc<dyn RawDocumentRepository>,
    pub vector_factory: Arc<dyn VectorStoreFactory>,
    pub embedder: Arc<dyn Embedder>,
    pub pipeline: Arc<IngestionPipeline>,
    pub uploads: Arc<FileUploadIngestor>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Connection registry backed by the `connections_collection`.
    ///
    /// Requires `security.encryption_key`.
    pub async fn connection_registry(&self) -> anyhow::Result<Arc<ConnectionRegistry>> {
        let key = self.config.security.encryption_key.as_deref().unwrap_or_default();
        let cipher = AesGcmSecretCipher::from_base64_key(key)?;

        let repository = MongoConnectionRepository::new(
            &self.mongo,
            &self.config.mongodb.database_name,
            &self.config.mongodb.connections_collection,
        );
        repository.ensure_indexes().await?;
        let repository: Arc<dyn ConnectionRepository> = Arc::new(repository);

        Ok(Arc::new(ConnectionRegistry::new(
            repository,
            Arc::new(cipher),
            self.vector_factory.clone(),
        )))
    }

    /// Question answering over the default connection plus registered ones
    pub async fn rag_service(&self) -> anyhow::Result<RagService> {
        self.config.llm.validate()?;

        let llm_http = http_client(self.config.llm.timeout_secs)?;
        let llm = HttpLanguageModel::new(
            llm_http,
            self.config.llm.api_url.clone(),
            self.config.llm.api_key.clone(),
            LlmSettings {
                model: self.config.llm.model.clone(),
                temperature: self.config.llm.temperature,
                max_tokens: self.config.llm.max_tokens,
            },
        );

        let max_concurrency = self.config.retrieval.max_concurrency;
        let service = RagService::new(
            self.embedder.clone(),
            Arc::new(llm),
            self.connection_registry().await?,
            UnifiedRetrieval::new(self.vector_factory.clone(), max_concurrency),
            CollectionDiagnostics::new(self.vector_factory.clone()),
        )
        .with_default_connection(self.default_connection());

        Ok(service)
    }

    pub fn default_connection(&self) -> Connection {
        Connection::new(
            DEFAULT_CONNECTION_ID,
            ProviderType::Mongo,
            self.config.mongodb.uri.clone(),
        )
        .with_display_name("Configured MongoDB")
    }
}

fn http_client(timeout_secs: u64) -> anyhow::Result<Arc<dyn HttpClientTrait>> {
    Ok(Arc::new(HttpClient::with_timeout(Duration::from_secs(
        timeout_secs,
    ))?))
}

/// Create the application state from configuration.
///
/// Only the Mongo URI is required here; the LLM and the encryption key are
/// checked by the services that need them.
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    config.mongodb.validate()?;
    config.chunking.validate()?;

    let mongo_config = &config.mongodb;
    let timeouts = mongo_config.timeouts();
    info!(database = %mongo_config.database_name, "Connecting to MongoDB");
    let client = mongo::connect(&mongo_config.uri, "pmp-rag-backend", timeouts).await?;
    if !mongo::ping(&client).await {
        anyhow::bail!("MongoDB is not reachable at the configured URI");
    }

    let raw_repository = MongoRawDocumentRepository::new(
        &client,
        &mongo_config.database_name,
        &mongo_config.raw_collection,
    );
    raw_repository.ensure_indexes().await?;
    let raw_store: Arc<dyn RawDocumentRepository> = Arc::new(raw_repository);
    let semantic_store: Arc<dyn SemanticChunkRepository> =
        Arc::new(MongoSemanticChunkRepository::new(client.clone()));

    let provider_http = http_client(config.embedding.timeout_secs)?;
    let vector_factory: Arc<dyn VectorStoreFactory> = Arc::new(DefaultVectorStoreFactory::new(
        provider_http.clone(),
        MongoVectorDefaults {
            database: mongo_config.database_name.clone(),
            collection: mongo_config.vector_collection.clone(),
            index_name: mongo_config.vector_index_name.clone(),
            timeouts,
        },
    ));
    let vector_store = Arc::new(MongoVectorStore::new(
        client.clone(),
        &mongo_config.database_name,
        &mongo_config.vector_collection,
        &mongo_config.vector_index_name,
    ));

    let embedding = &config.embedding;
    let http_embedder = HttpEmbedder::new(
        provider_http.clone(),
        &embedding.api_url,
        embedding.api_key.clone(),
        embedding.model.clone(),
        embedding.dimension,
    );
    let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(
        Arc::new(http_embedder),
        Duration::from_secs(embedding.cache_ttl_secs),
    ));

    let pipeline = Arc::new(IngestionPipeline::new(IngestionPipelineDeps {
        raw_store: raw_store.clone(),
        semantic_store,
        vector_store,
        embedder: embedder.clone(),
        chunker: Arc::new(RecursiveChunker::new()),
        origin_factory: Arc::new(DefaultOriginSourceFactory::new(provider_http, timeouts)),
        chunking: config.chunking,
        default_database: mongo_config.database_name.clone(),
    }));

    let uploads = Arc::new(FileUploadIngestor::new(
        pipeline.clone(),
        Arc::new(PlainTextExtractor),
        UploadPolicy {
            max_file_size_mb: config.upload.max_file_size_mb,
            allowed_extensions: config.upload.allowed_extensions.clone(),
        },
    ));

    info!("Application state initialized");

    Ok(AppState {
        config: config.clone(),
        mongo: client,
        raw_store,
        vector_factory,
        embedder,
        pipeline,
        uploads,
    })
}

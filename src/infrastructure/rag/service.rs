//! Retrieval-augmented answer generation

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::domain::connection::Connection;
use crate::domain::embedding::Embedder;
use crate::domain::language_model::LanguageModel;
use crate::domain::retrieval::{QueryRequest, QueryResponse, RetrievalDiagnosis, SourceReference};
use crate::domain::vector_store::VectorSearchResult;
use crate::domain::DomainError;
use crate::infrastructure::connection::ConnectionRegistry;
use crate::infrastructure::llm::answer_from_error;
use crate::infrastructure::retrieval::{plan_targets, CollectionDiagnostics, UnifiedRetrieval};

const PREVIEW_CHARS: usize = 200;

/// Render retrieved chunks as numbered, attributed context blocks
pub fn format_context(results: &[VectorSearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "[Source {}: {}, lines {}-{}]\n{}\n",
                i + 1,
                result.file_name,
                result.line_start,
                result.line_end,
                result.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful AI assistant. Answer the question based on the provided context.\n\
         If you cannot answer based on the context, say so clearly.\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\n\
         Answer: Provide a clear, concise answer based on the context above. \
         If you reference information from the context, be specific about which source it comes from."
    )
}

fn source_reference(result: &VectorSearchResult) -> SourceReference {
    let preview: String = result.content.chars().take(PREVIEW_CHARS).collect();

    SourceReference {
        file_name: result.file_name.clone(),
        line_start: result.line_start,
        line_end: result.line_end,
        content: format!("{}...", preview),
        relevance_score: (result.score * 10_000.0).round() / 10_000.0,
    }
}

#[derive(Debug)]
pub struct RagService {
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    registry: Arc<ConnectionRegistry>,
    retrieval: UnifiedRetrieval,
    diagnostics: CollectionDiagnostics,
    default_connection: Option<Connection>,
}

impl RagService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        registry: Arc<ConnectionRegistry>,
        retrieval: UnifiedRetrieval,
        diagnostics: CollectionDiagnostics,
    ) -> Self {
        Self {
            embedder,
            llm,
            registry,
            retrieval,
            diagnostics,
            default_connection: None,
        }
    }

    /// Connection searched when a request names none
    pub fn with_default_connection(mut self, connection: Connection) -> Self {
        self.default_connection = Some(connection);
        self
    }

    async fn connections(&self, request: &QueryRequest) -> Result<Vec<Connection>, DomainError> {
        if !request.connection_ids.is_empty() {
            return self.registry.resolve(&request.connection_ids).await;
        }

        self.default_connection
            .clone()
            .map(|c| vec![c])
            .ok_or_else(|| {
                DomainError::configuration(
                    "No connection selected and no default vector store configured",
                )
            })
    }

    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, DomainError> {
        request
            .validate()
            .map_err(|e| DomainError::validation(format!("Invalid query: {}", e)))?;

        let connections = self.connections(&request).await?;
        let targets = plan_targets(&connections, &request.collections);
        let embedding = self.embedder.embed(&request.query).await?;

        let results = self
            .retrieval
            .search(&embedding, &targets, request.top_k)
            .await;

        if results.is_empty() {
            let mut diagnostics = Vec::new();
            for target in &targets {
                for collection in &target.collections {
                    diagnostics.push(
                        self.diagnostics
                            .diagnose(&target.connection, collection.as_deref(), &embedding)
                            .await,
                    );
                }
            }

            let answer = diagnostics
                .iter()
                .find(|d| !d.is_healthy())
                .unwrap_or(&RetrievalDiagnosis::NoRelevantContent)
                .message();
            warn!(query = %request.query, "No results for query");

            return Ok(QueryResponse {
                answer,
                sources: Vec::new(),
                query: request.query,
                diagnostics,
            });
        }

        let context = format_context(&results);
        let prompt = build_prompt(&request.query, &context);
        let answer = match self.llm.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Answer generation failed");
                answer_from_error(&e)
            }
        };

        info!(
            query = %request.query,
            sources = results.len(),
            model = self.llm.model_name(),
            "Answered query"
        );

        Ok(QueryResponse {
            answer,
            sources: results.iter().map(source_reference).collect(),
            query: request.query,
            diagnostics: Vec::new(),
        })
    }
}

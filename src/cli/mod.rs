//! CLI module for the PMP RAG backend
//!
//! One subcommand per operation:
//! - `ingest`: origin documents into the raw store
//! - `sync`: an origin collection straight into its semantic collection
//! - `process`: raw documents into vector chunks
//! - `upload`: a local file through the upload path
//! - `query`: answer a question over the stored chunks
//! - `status`: raw document counts per status
//! - `watch`: realtime ingestion from a change stream
//! - `connections`: manage vector store connections

pub mod connections;
pub mod ingest;
pub mod process;
pub mod query;
pub mod status;
pub mod sync;
pub mod upload;
pub mod watch;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::{create_app_state, AppState};

/// PMP RAG Backend - ingestion and retrieval for RAG
#[derive(Parser)]
#[command(name = "pmp-rag-backend")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest origin documents into the raw document store
    Ingest(ingest::IngestArgs),

    /// Ingest an origin collection into its semantic collection
    Sync(sync::SyncArgs),

    /// Chunk, embed and store raw documents
    Process(process::ProcessArgs),

    /// Upload a local file and process it
    Upload(upload::UploadArgs),

    /// Answer a question from the stored chunks
    Query(query::QueryArgs),

    /// Show raw document counts per status
    Status,

    /// Ingest changes from a MongoDB change stream until Ctrl+C
    Watch(watch::WatchArgs),

    /// Manage vector store connections
    Connections(connections::ConnectionsArgs),
}

/// Load `.env` and configuration, then initialize logging
pub(crate) fn load_config() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);
    config
}

pub(crate) async fn bootstrap() -> anyhow::Result<AppState> {
    let config = load_config();
    create_app_state(&config).await
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancel `token` on Ctrl+C so batches stop before their next item
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping after the current item");
            token.cancel();
        }
    });
}

/// Parse a JSON origin connection config given on the command line
pub(crate) fn parse_origin_config(
    raw: Option<&str>,
) -> anyhow::Result<Option<crate::domain::OriginConnectionConfig>> {
    raw.map(|json| {
        serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("Invalid --config-json: {}", e))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OriginSourceType;

    #[test]
    fn test_parse_ingest_args() {
        let cli = Cli::try_parse_from([
            "pmp-rag-backend",
            "ingest",
            "--source-type",
            "mongodb",
            "--origin-id",
            "a",
            "--origin-id",
            "b",
            "--process",
        ])
        .unwrap();

        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.source_type, OriginSourceType::Mongodb);
                assert_eq!(args.origin_ids, vec!["a", "b"]);
                assert!(args.process);
                assert!(!args.no_skip_duplicates);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_rejects_unknown_source_type() {
        let parsed = Cli::try_parse_from([
            "pmp-rag-backend",
            "ingest",
            "--source-type",
            "ftp",
            "--origin-id",
            "a",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_query_args() {
        let cli = Cli::try_parse_from([
            "pmp-rag-backend",
            "query",
            "what is rust?",
            "--connection",
            "qdrant-local",
            "--collection",
            "qdrant-local:docs",
            "--top-k",
            "3",
        ])
        .unwrap();

        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.text, "what is rust?");
                assert_eq!(args.connections, vec!["qdrant-local"]);
                assert_eq!(args.collections, vec!["qdrant-local:docs"]);
                assert_eq!(args.top_k, Some(3));
            }
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn test_parse_origin_config() {
        let config = parse_origin_config(Some(
            r#"{"uri": "mongodb://localhost", "database_name": "db", "collection_name": "movies"}"#,
        ))
        .unwrap()
        .unwrap();
        assert_eq!(config.collection_name.as_deref(), Some("movies"));

        assert!(parse_origin_config(None).unwrap().is_none());
        assert!(parse_origin_config(Some("{not json")).is_err());
    }
}

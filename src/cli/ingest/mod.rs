//! Ingest command - origin documents into the raw document store

use clap::Args;
use serde_json::json;
use tracing::info;

use crate::cli::{bootstrap, cancel_on_ctrl_c, parse_origin_config, print_json};
use crate::domain::{ItemStatus, OriginSourceType};

#[derive(Args, Clone, Debug)]
pub struct IngestArgs {
    /// Origin source type (mongodb, qdrant, filesystem)
    #[arg(long)]
    pub source_type: OriginSourceType,

    /// Origin document id; repeat for a batch
    #[arg(long = "origin-id", required = true)]
    pub origin_ids: Vec<String>,

    /// Identifier of the origin recorded on the raw documents
    #[arg(long)]
    pub source_id: Option<String>,

    /// Origin connection config as JSON
    #[arg(long)]
    pub config_json: Option<String>,

    /// Overwrite raw documents that were already ingested
    #[arg(long)]
    pub no_skip_duplicates: bool,

    /// Process the ingested documents into vector chunks
    #[arg(long)]
    pub process: bool,

    /// Vector collection for processing
    #[arg(long)]
    pub target_collection: Option<String>,
}

pub async fn run(args: IngestArgs) -> anyhow::Result<()> {
    let state = bootstrap().await?;
    let pipeline = state.pipeline.clone();
    cancel_on_ctrl_c(pipeline.cancellation_token());

    let config = parse_origin_config(args.config_json.as_deref())?;
    let skip_duplicates = !args.no_skip_duplicates;

    let ingested = pipeline
        .ingest_origin_documents_batch(
            args.source_type,
            &args.origin_ids,
            args.source_id.as_deref(),
            config.as_ref(),
            skip_duplicates,
        )
        .await?;
    info!(
        successful = ingested.successful,
        skipped = ingested.skipped,
        failed = ingested.failed,
        "Ingestion finished"
    );

    if !args.process {
        return print_json(&ingested);
    }

    let to_process: Vec<String> = ingested
        .details
        .iter()
        .filter(|d| d.status == ItemStatus::Success)
        .filter_map(|d| d.raw_document_id.clone())
        .collect();
    let processed = pipeline
        .process_multiple_raw_documents(&to_process, args.target_collection.as_deref())
        .await;

    print_json(&json!({"ingestion": ingested, "processing": processed}))
}

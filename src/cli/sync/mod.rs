//! Sync command - an origin collection into its semantic collection

use chrono::{DateTime, Utc};
use clap::Args;

use crate::cli::{bootstrap, cancel_on_ctrl_c, parse_origin_config, print_json};
use crate::domain::OriginSourceType;

#[derive(Args, Clone, Debug)]
pub struct SyncArgs {
    /// Origin source type (mongodb, qdrant, filesystem)
    #[arg(long)]
    pub source_type: OriginSourceType,

    /// Origin connection config as JSON
    #[arg(long)]
    pub config_json: String,

    /// Only documents created or updated since this RFC 3339 timestamp
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Maximum number of documents to fetch
    #[arg(long)]
    pub limit: Option<usize>,

    /// Re-ingest origins that already have semantic chunks
    #[arg(long)]
    pub no_skip_duplicates: bool,
}

pub async fn run(args: SyncArgs) -> anyhow::Result<()> {
    let state = bootstrap().await?;
    cancel_on_ctrl_c(state.pipeline.cancellation_token());

    let config = parse_origin_config(Some(args.config_json.as_str()))?.unwrap_or_default();
    let result = state
        .pipeline
        .ingest_origin_collection_to_semantic(
            args.source_type,
            &config,
            args.since,
            args.limit,
            !args.no_skip_duplicates,
        )
        .await?;

    print_json(&result)
}

//! Upload command - a local file through the upload path

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::{bootstrap, print_json};

#[derive(Args, Clone, Debug)]
pub struct UploadArgs {
    /// File to upload
    pub path: PathBuf,

    /// Vector collection to store the chunks in
    #[arg(long)]
    pub target_collection: Option<String>,
}

pub async fn run(args: UploadArgs) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let file_name = args
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let state = bootstrap().await?;
    let outcome = state
        .uploads
        .upload(&file_name, &bytes, args.target_collection.as_deref())
        .await?;

    print_json(&outcome)
}

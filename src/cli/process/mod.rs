//! Process command - raw documents into vector chunks

use clap::Args;

use crate::cli::{bootstrap, cancel_on_ctrl_c, print_json};

#[derive(Args, Clone, Debug)]
pub struct ProcessArgs {
    /// Raw document id; repeat for several
    #[arg(long = "raw-id", required = true)]
    pub raw_ids: Vec<String>,

    /// Vector collection to store the chunks in
    #[arg(long)]
    pub target_collection: Option<String>,
}

pub async fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let state = bootstrap().await?;
    cancel_on_ctrl_c(state.pipeline.cancellation_token());

    if let [raw_id] = args.raw_ids.as_slice() {
        let result = state
            .pipeline
            .process_raw_document(raw_id, args.target_collection.as_deref())
            .await?;
        return print_json(&result);
    }

    let result = state
        .pipeline
        .process_multiple_raw_documents(&args.raw_ids, args.target_collection.as_deref())
        .await;
    print_json(&result)
}

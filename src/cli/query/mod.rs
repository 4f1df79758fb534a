//! Query command - answer a question from the stored chunks

use clap::Args;

use crate::cli::{bootstrap, print_json};
use crate::domain::QueryRequest;

#[derive(Args, Clone, Debug)]
pub struct QueryArgs {
    /// Question to answer
    pub text: String,

    /// Registered connection to search; repeat for several
    #[arg(long = "connection")]
    pub connections: Vec<String>,

    /// Collection as `name`, `db.name` or `connection:name`; repeat for several
    #[arg(long = "collection")]
    pub collections: Vec<String>,

    /// Number of chunks to use as context
    #[arg(long)]
    pub top_k: Option<usize>,
}

pub async fn run(args: QueryArgs) -> anyhow::Result<()> {
    let state = bootstrap().await?;
    let rag = state.rag_service().await?;

    let top_k = args.top_k.unwrap_or(state.config.retrieval.default_top_k);
    let request = QueryRequest::new(args.text)
        .with_top_k(top_k)
        .with_connections(args.connections)
        .with_collections(args.collections);

    let response = rag.query(request).await?;
    print_json(&response)
}

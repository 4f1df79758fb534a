use clap::Parser;
use pmp_rag_backend::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest(args) => cli::ingest::run(args).await,
        Command::Sync(args) => cli::sync::run(args).await,
        Command::Process(args) => cli::process::run(args).await,
        Command::Upload(args) => cli::upload::run(args).await,
        Command::Query(args) => cli::query::run(args).await,
        Command::Status => cli::status::run().await,
        Command::Watch(args) => cli::watch::run(args).await,
        Command::Connections(args) => cli::connections::run(args).await,
    }
}

//! Watch command - realtime ingestion from a MongoDB change stream

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::signal;
use tracing::info;

use crate::cli::{bootstrap, print_json};
use crate::domain::OriginConnectionConfig;
use crate::infrastructure::realtime::{
    MongoChangeEventSource, RealtimeIngestionService, RealtimeSettings,
};

#[derive(Args, Clone, Debug)]
pub struct WatchArgs {
    /// Database of the watched collection
    #[arg(long)]
    pub database: String,

    /// Collection to watch
    #[arg(long)]
    pub collection: String,

    /// Process ingested documents into this vector collection
    #[arg(long)]
    pub target_collection: Option<String>,

    /// Identifier of the origin recorded on the raw documents
    #[arg(long)]
    pub source_id: Option<String>,
}

pub async fn run(args: WatchArgs) -> anyhow::Result<()> {
    let state = bootstrap().await?;

    let source = MongoChangeEventSource::new(&state.mongo, &args.database, &args.collection);
    let mut settings = RealtimeSettings::new(OriginConnectionConfig::mongodb(
        state.config.mongodb.uri.clone(),
        args.database.clone(),
        args.collection.clone(),
    ));
    settings.source_id = args.source_id;
    settings.target_collection = args.target_collection;
    settings.queue_capacity = state.config.realtime.queue_capacity;
    settings.shutdown_timeout = Duration::from_secs(state.config.realtime.shutdown_timeout_secs);

    let service = RealtimeIngestionService::new(Arc::new(source), state.pipeline.clone(), settings);
    service.start().await?;
    info!(
        database = %args.database,
        collection = %args.collection,
        "Watching for changes, press Ctrl+C to stop"
    );

    shutdown_signal().await;
    service.stop().await;

    print_json(&service.stats())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping realtime ingestion");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping realtime ingestion");
        },
    }
}

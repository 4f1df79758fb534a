//! Realtime ingestion service
//!
//! A watcher task turns change events into queue entries and a worker task
//! drains the queue through the ingestion pipeline. Both stop on the same
//! cancellation token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::origin::{
    ChangeEvent, ChangeEventSource, OriginConnectionConfig, OriginSourceType,
};
use crate::domain::DomainError;
use crate::infrastructure::ingestion::IngestionPipeline;

#[derive(Debug, Clone)]
pub struct RealtimeSettings {
    /// Origin the change events refer to
    pub origin: OriginConnectionConfig,
    pub source_id: Option<String>,
    /// Process ingested documents into this vector collection
    pub target_collection: Option<String>,
    pub queue_capacity: usize,
    pub reconnect_delay: Duration,
    pub shutdown_timeout: Duration,
}

impl RealtimeSettings {
    pub fn new(origin: OriginConnectionConfig) -> Self {
        Self {
            origin,
            source_id: None,
            target_collection: None,
            queue_capacity: 256,
            reconnect_delay: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    ingested: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RealtimeStats {
    pub received: u64,
    pub ingested: u64,
    pub skipped: u64,
    pub failed: u64,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

pub struct RealtimeIngestionService {
    source: Arc<dyn ChangeEventSource>,
    pipeline: Arc<IngestionPipeline>,
    settings: Arc<RealtimeSettings>,
    counters: Arc<Counters>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for RealtimeIngestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeIngestionService")
            .field("source", &self.source)
            .field("settings", &self.settings)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl RealtimeIngestionService {
    pub fn new(
        source: Arc<dyn ChangeEventSource>,
        pipeline: Arc<IngestionPipeline>,
        settings: RealtimeSettings,
    ) -> Self {
        Self {
            source,
            pipeline,
            settings: Arc::new(settings),
            counters: Arc::new(Counters::default()),
            running: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub fn stats(&self) -> RealtimeStats {
        RealtimeStats {
            received: self.counters.received.load(Ordering::SeqCst),
            ingested: self.counters.ingested.load(Ordering::SeqCst),
            skipped: self.counters.skipped.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    pub async fn start(&self) -> Result<(), DomainError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(DomainError::conflict("Realtime ingestion is already running"));
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.settings.queue_capacity.max(1));

        let watcher = tokio::spawn(watch(
            self.source.clone(),
            tx,
            self.counters.clone(),
            self.settings.reconnect_delay,
            cancel.clone(),
        ));
        let worker = tokio::spawn(work(
            rx,
            self.pipeline.clone(),
            self.settings.clone(),
            self.counters.clone(),
            cancel.clone(),
        ));

        *running = Some(Running {
            cancel,
            tasks: vec![watcher, worker],
        });
        info!("Realtime ingestion started");
        Ok(())
    }

    /// Signal both tasks and wait up to the shutdown timeout for each
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        running.cancel.cancel();
        for task in running.tasks {
            let abort = task.abort_handle();
            match tokio::time::timeout(self.settings.shutdown_timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Realtime task panicked"),
                Err(_) => {
                    warn!("Realtime task did not stop in time, aborting");
                    abort.abort();
                }
            }
        }

        info!(stats = ?self.stats(), "Realtime ingestion stopped");
    }
}

async fn watch(
    source: Arc<dyn ChangeEventSource>,
    tx: mpsc::Sender<ChangeEvent>,
    counters: Arc<Counters>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        let opened = tokio::select! {
            _ = cancel.cancelled() => break,
            opened = source.open() => opened,
        };

        match opened {
            Ok(mut stream) => loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return,
                    next = stream.next() => next,
                };

                match next {
                    Some(Ok(event)) => {
                        counters.received.fetch_add(1, Ordering::SeqCst);
                        debug!(doc_id = %event.doc_id, operation = %event.operation_type, "Queued change");
                        let sent = tokio::select! {
                            _ = cancel.cancelled() => return,
                            sent = tx.send(event) => sent,
                        };
                        if sent.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Change stream error, reopening");
                        break;
                    }
                    None => {
                        warn!("Change stream ended, reopening");
                        break;
                    }
                }
            },
            Err(e) => error!(error = %e, "Failed to open change stream"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

async fn work(
    mut rx: mpsc::Receiver<ChangeEvent>,
    pipeline: Arc<IngestionPipeline>,
    settings: Arc<RealtimeSettings>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => event,
        };
        let Some(event) = event else {
            break;
        };

        match handle(&pipeline, &settings, &event).await {
            Ok(true) => {
                counters.ingested.fetch_add(1, Ordering::SeqCst);
            }
            Ok(false) => {
                counters.skipped.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!(doc_id = %event.doc_id, error = %e, "Realtime ingestion failed");
            }
        }
    }
}

/// Returns whether the document was newly ingested
async fn handle(
    pipeline: &IngestionPipeline,
    settings: &RealtimeSettings,
    event: &ChangeEvent,
) -> Result<bool, DomainError> {
    let outcome = pipeline
        .ingest_origin_document(
            OriginSourceType::Mongodb,
            &event.doc_id,
            settings.source_id.as_deref(),
            Some(&settings.origin),
            true,
        )
        .await?;

    if outcome.skipped {
        debug!(doc_id = %event.doc_id, "Change already ingested");
        return Ok(false);
    }

    if let Some(target) = settings.target_collection.as_deref() {
        pipeline
            .process_raw_document(&outcome.raw_document_id, Some(target))
            .await?;
    }

    info!(
        doc_id = %event.doc_id,
        operation = %event.operation_type,
        raw_document_id = %outcome.raw_document_id,
        "Ingested change"
    );
    Ok(true)
}

//! MongoDB change stream as a change event source

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{doc, Document};
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType};
use mongodb::{Client, Collection};
use tracing::info;

use crate::domain::origin::{ChangeEvent, ChangeEventSource, ChangeStream};
use crate::domain::DomainError;
use crate::infrastructure::mongo::{id_to_string, storage_error};

/// Watches inserts, updates and replacements on one collection
#[derive(Debug, Clone)]
pub struct MongoChangeEventSource {
    collection: Collection<Document>,
}

impl MongoChangeEventSource {
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            collection: client.database(database).collection(collection),
        }
    }
}

fn to_change_event(event: ChangeStreamEvent<Document>) -> Option<ChangeEvent> {
    let operation = match event.operation_type {
        OperationType::Insert => "insert",
        OperationType::Update => "update",
        OperationType::Replace => "replace",
        _ => return None,
    };
    let doc_id = event.document_key.as_ref()?.get("_id").map(id_to_string)?;

    Some(ChangeEvent::new(doc_id, operation))
}

#[async_trait]
impl ChangeEventSource for MongoChangeEventSource {
    async fn open(&self) -> Result<ChangeStream, DomainError> {
        let pipeline = vec![doc! {
            "$match": {"operationType": {"$in": ["insert", "update", "replace"]}}
        }];

        let stream = self
            .collection
            .watch()
            .pipeline(pipeline)
            .await
            .map_err(|e| storage_error("Failed to open change stream", e))?;

        info!(
            namespace = %self.collection.namespace(),
            "Watching collection for changes"
        );

        Ok(stream
            .filter_map(|event| async move {
                match event {
                    Ok(event) => to_change_event(event).map(Ok),
                    Err(e) => Some(Err(storage_error("Change stream failed", e))),
                }
            })
            .boxed())
    }
}

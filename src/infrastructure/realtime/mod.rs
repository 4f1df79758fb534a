//! Realtime ingestion driven by origin change events

mod change_stream;
mod service;

pub use change_stream::MongoChangeEventSource;
pub use service::{RealtimeIngestionService, RealtimeSettings, RealtimeStats};
